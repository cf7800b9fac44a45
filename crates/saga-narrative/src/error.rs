use thiserror::Error;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("graph error: {0}")]
    Graph(#[from] saga_graph::GraphError),
}
