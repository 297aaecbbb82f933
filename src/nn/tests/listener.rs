use std::sync::{Arc, Mutex};

use super::{build, sgd_config, small_classifier};
use crate::nn::{PerformanceListener, ScoreIterationListener, TrainingListener};
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Iteration { iteration: usize, epoch: usize },
    EpochEnd(usize),
}

#[derive(Default)]
struct Recorder {
    events: Arc<Mutex<Vec<(String, Event)>>>,
}

impl TrainingListener for Recorder {
    fn iteration_done(&mut self, graph: &str, iteration: usize, epoch: usize, _score: f32) {
        let event = Event::Iteration { iteration, epoch };
        self.events.lock().unwrap().push((graph.to_string(), event));
    }

    fn on_epoch_end(&mut self, graph: &str, epoch: usize) {
        self.events
            .lock()
            .unwrap()
            .push((graph.to_string(), Event::EpochEnd(epoch)));
    }
}

#[test]
fn test_listeners_see_iterations_and_epochs() {
    let recorder = Recorder::default();
    let events = Arc::clone(&recorder.events);
    let mut graph = build(small_classifier(), sgd_config(0.1));
    graph.set_listeners(vec![
        Box::new(recorder),
        Box::new(ScoreIterationListener::new(0)),
        Box::new(PerformanceListener::new(1)),
    ]);

    let features = Tensor::new(&[1., 0., -1.], &[1, 3]);
    let labels = Tensor::new(&[0., 1.], &[1, 2]);
    graph.fit_tensors(&[&features], &[&labels]).unwrap();
    graph.fit_tensors(&[&features], &[&labels]).unwrap();
    graph.increment_epoch();
    graph.fit_tensors(&[&features], &[&labels]).unwrap();

    let events = events.lock().unwrap();
    let recorded = events.iter().map(|(_, e)| e.clone()).collect::<Vec<_>>();
    assert_eq!(
        recorded,
        vec![
            Event::Iteration { iteration: 1, epoch: 0 },
            Event::Iteration { iteration: 2, epoch: 0 },
            Event::EpochEnd(1),
            Event::Iteration { iteration: 3, epoch: 1 },
        ]
    );
    assert!(events.iter().all(|(graph, _)| graph == "test"));
}

#[test]
fn test_failed_fit_does_not_notify() {
    let recorder = Recorder::default();
    let events = Arc::clone(&recorder.events);
    let mut graph = build(small_classifier(), sgd_config(0.1));
    graph.add_listener(Box::new(recorder));
    let wrong = Tensor::ones(&[1, 5]);
    assert!(graph.fit_tensors(&[&wrong], &[&Tensor::ones(&[1, 2])]).is_err());
    assert!(events.lock().unwrap().is_empty());
}
