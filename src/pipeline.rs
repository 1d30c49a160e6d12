// imports
use crate::config::{read_input, LabeledData, RunParams, SimilarityTable};
use crate::error::Error;
use crate::graph::AssociationGraph;
use crate::train::{RunReport, Trainer};

use std::fmt::Display;
use std::time::Instant;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info};


/// Everything a run produces for the console.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineReport {
    pub run: RunReport,
    pub predictions: Vec<(String, Option<String>)>,
    pub similarities: Vec<(String, String, f64)>,
}

impl Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {

        for record in &self.run.epochs {
            if self.run.stopped_at == Some(record.epoch) {
                writeln!(f, "Training stopped early at epoch {}", record.epoch + 1)?;
            } else {
                writeln!(f, "Epoch {}: Best accuracy = {}", record.epoch + 1, six_digits(record.best_accuracy))?;
            }
        }
        for (word, language) in &self.predictions {
            writeln!(f, "Predicted language for '{}': {}", word, language.as_deref().unwrap_or(""))?;
        }
        for (first, second, similarity) in &self.similarities {
            writeln!(f, "Similarity between '{}' and '{}': {}", first, second, six_digits(*similarity))?;
        }
        Ok(())
    }
}

/// Six significant digits, trailing zeros dropped, scientific notation
/// outside [1e-4, 1e6): the usual console rendering of a double.
fn six_digits(value: f64) -> String {

    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }

    // the exponent is taken after rounding, so 9999999 becomes 1e+07
    let scientific = format!("{:.5e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}


pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure -
    // -> loading of examples and similarities
    // -> training with early stopping
    // -> answering the configured queries

    pub fn run(params: &RunParams) -> Result<PipelineReport, Error> {

        let data = read_input::<LabeledData>(&params.training_file)?;
        let table = read_input::<SimilarityTable>(&params.similarity_file)?;

        let mut graph = AssociationGraph::new();
        graph.add_similarities(&table);

        // normalization and validation run on this pool, reinforcement stays on one thread
        let pool = ThreadPoolBuilder::new()
            .num_threads(params.num_threads)
            .build()
            .map_err(|e| Error::invalid("num_threads", e.to_string()))?;

        let timer = Instant::now();
        info!("starting training on {} examples, validating on {}...",
            data.training_data.len(), data.validation_data.len());
        let trainer = Trainer::new(params.train.clone());
        let run = pool.install(|| trainer.run(&mut graph, &data.training_data, &data.validation_data));
        info!("finished training, best accuracy {}. Took {} ms ...", run.best_accuracy, timer.elapsed().as_millis());

        debug!("final graph:\n{}", graph);

        let predictions = params
            .classify
            .iter()
            .map(|word| (word.to_owned(), graph.classify(word).map(str::to_owned)))
            .collect();
        let similarities = params
            .similarity_queries
            .iter()
            .map(|(first, second)| (first.to_owned(), second.to_owned(), graph.word_similarity(first, second)))
            .collect();

        Ok(PipelineReport { run, predictions, similarities })
    }

}


#[cfg(test)]
mod tests {

    use super::{PipelineReport, six_digits};
    use crate::train::{EpochReport, RunReport};

    fn epoch(epoch: usize, best_accuracy: f64) -> EpochReport {
        EpochReport { epoch, learning_rate: 0.1, accuracy: best_accuracy, best_accuracy }
    }

    #[test]
    fn six_significant_digits() {

        assert_eq!(six_digits(2.0 / 3.0), "0.666667");
        assert_eq!(six_digits(0.5), "0.5");
        assert_eq!(six_digits(1.0), "1");
        assert_eq!(six_digits(0.0), "0");
        assert_eq!(six_digits(0.9), "0.9");
        assert_eq!(six_digits(-0.125), "-0.125");
        assert_eq!(six_digits(123456.0), "123456");
        assert_eq!(six_digits(1234567.0), "1.23457e+06");
        assert_eq!(six_digits(9999999.0), "1e+07");
        assert_eq!(six_digits(0.0001), "0.0001");
        assert_eq!(six_digits(0.00001234), "1.234e-05");
    }

    #[test]
    fn report_matches_console_format() {

        let report = PipelineReport {
            run: RunReport {
                epochs: vec![epoch(0, 0.5), epoch(1, 2.0 / 3.0), epoch(2, 2.0 / 3.0)],
                best_accuracy: 2.0 / 3.0,
                stopped_at: Some(2),
            },
            predictions: vec![("boat".to_string(), Some("english".to_string())), ("zzz".to_string(), None)],
            similarities: vec![("car".to_string(), "automobile".to_string(), 0.9)],
        };

        let expected = "Epoch 1: Best accuracy = 0.5\n\
                        Epoch 2: Best accuracy = 0.666667\n\
                        Training stopped early at epoch 3\n\
                        Predicted language for 'boat': english\n\
                        Predicted language for 'zzz': \n\
                        Similarity between 'car' and 'automobile': 0.9\n";
        assert_eq!(report.to_string(), expected);
    }

}
