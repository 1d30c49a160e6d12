use rayon::prelude::*;
use crate::config::Example;
use crate::graph::{AssociationGraph, Neighbors};
use std::fmt::Display;
use tracing::{debug, info};


#[derive(Clone, Debug, PartialEq)]
pub struct TrainParams {
    pub initial_rate: f64,
    pub epochs: usize,
    pub decay_rate: f64,
    pub patience: usize,
    /// Give a freshly created true-label edge its reinforcement on creation,
    /// on top of the regular neighbor pass of the same example.
    pub reinforce_on_create: bool,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            initial_rate: 0.1,
            epochs: 10,
            decay_rate: 0.01,
            patience: 3,
            reinforce_on_create: true,
        }
    }
}

impl Display for TrainParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        initial_rate: {},
        epochs: {},
        decay_rate: {},
        patience: {},
        reinforce_on_create: {}",
        self.initial_rate, self.epochs, self.decay_rate, self.patience, self.reinforce_on_create
        )
    }
}


/// Validation bookkeeping of a single run.
#[derive(Clone, Debug, PartialEq)]
pub struct EarlyStopping {
    best_accuracy: f64,
    no_improvement_count: usize,
    patience: usize,
}

impl EarlyStopping {

    pub fn new(patience: usize) -> Self {
        Self {
            best_accuracy: 0.0,
            no_improvement_count: 0,
            patience,
        }
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    pub fn no_improvement_count(&self) -> usize {
        self.no_improvement_count
    }

    /// Record one validation accuracy. Returns true once `patience`
    /// evaluations in a row failed to strictly beat the best accuracy.
    pub fn update(&mut self, accuracy: f64) -> bool {
        if accuracy > self.best_accuracy {
            self.best_accuracy = accuracy;
            self.no_improvement_count = 0;
            false
        } else {
            self.no_improvement_count += 1;
            self.no_improvement_count >= self.patience
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub stop: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub learning_rate: f64,
    pub accuracy: f64,
    pub best_accuracy: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    pub epochs: Vec<EpochReport>,
    pub best_accuracy: f64,
    /// Zero-indexed epoch whose evaluation stopped the run.
    pub stopped_at: Option<usize>,
}


pub struct Trainer {
    params: TrainParams,
}

impl Trainer {

    pub fn new(params: TrainParams) -> Trainer {
        Self { params }
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    pub fn learning_rate(initial_rate: f64, decay_rate: f64, epoch: usize) -> f64 {
        initial_rate / (1.0 + decay_rate * epoch as f64)
    }

    /// One pass over the training examples, in order.
    ///
    /// Every outgoing edge of the example's word is pushed up by `rate` when
    /// it points at the true language and down by `rate` otherwise. The true
    /// edge is created at 0.0 if missing. Reinforcement stays sequential: the
    /// updates of one example depend on the edges left by the previous ones.
    pub fn reinforce(&self, graph: &mut AssociationGraph, examples: &[Example], rate: f64) {

        let mut created = 0;
        for example in examples {

            let word = example.token.as_str();
            let language = example.label.as_str();

            graph.add_node(word);
            graph.add_node(language);

            if !graph.edge_exists(word, language) {
                graph.add_edge(word, language, 0.0);
                if self.params.reinforce_on_create {
                    graph.update_weight(word, language, rate);
                }
                created += 1;
            }

            for (label, _) in graph.neighbors(word) {
                let delta = if label == language { rate } else { -rate };
                graph.update_weight(word, &label, delta);
            }
        }

        debug!("reinforced {} examples with rate {}, {} new edges", examples.len(), rate, created);
    }

    /// Divide every outgoing weight by the sum of its node's weights.
    /// Nodes whose weights sum to zero are left untouched.
    pub fn normalize(graph: &mut AssociationGraph) {

        let total_nodes = graph.node_count();
        let normalized: usize = graph
            .par_nodes_mut()
            .map(|(_, neighbors)| Trainer::normalize_node(neighbors) as usize)
            .sum();

        debug!("normalized {} of {} nodes", normalized, total_nodes);
    }

    fn normalize_node(neighbors: &mut Neighbors) -> bool {
        let total: f64 = neighbors.values().sum();
        if total == 0.0 {
            return false;
        }
        neighbors.values_mut().for_each(|weight| *weight /= total);
        true
    }

    /// Share of examples whose word classifies to its language. An empty
    /// example list scores 0.0.
    pub fn accuracy(graph: &AssociationGraph, examples: &[Example]) -> f64 {
        if examples.is_empty() {
            return 0.0;
        }
        let correct = examples
            .par_iter()
            .filter(|example| graph.classify(&example.token) == Some(example.label.as_str()))
            .count();
        correct as f64 / examples.len() as f64
    }

    pub fn evaluate(graph: &AssociationGraph, validation: &[Example], stopping: &mut EarlyStopping) -> Evaluation {
        let accuracy = Trainer::accuracy(graph, validation);
        let stop = stopping.update(accuracy);
        Evaluation { accuracy, stop }
    }

    pub fn run(&self, graph: &mut AssociationGraph, training: &[Example], validation: &[Example]) -> RunReport {

        let params = &self.params;
        let mut stopping = EarlyStopping::new(params.patience);
        let mut report = RunReport::default();

        for epoch in 0..params.epochs {

            let learning_rate = Trainer::learning_rate(params.initial_rate, params.decay_rate, epoch);
            self.reinforce(graph, training, learning_rate);
            Trainer::normalize(graph);

            let evaluation = Trainer::evaluate(graph, validation, &mut stopping);
            report.epochs.push(EpochReport {
                epoch,
                learning_rate,
                accuracy: evaluation.accuracy,
                best_accuracy: stopping.best_accuracy(),
            });

            if evaluation.stop {
                info!("training stopped early at epoch {}", epoch + 1);
                report.stopped_at = Some(epoch);
                break;
            }

            info!("epoch {}: learning rate {:.5}, accuracy {:.4}, best accuracy {:.4}",
                epoch + 1, learning_rate, evaluation.accuracy, stopping.best_accuracy());
        }

        report.best_accuracy = stopping.best_accuracy();
        report
    }

}
