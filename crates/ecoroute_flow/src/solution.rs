use serde::Serialize;

use crate::flow::Flow;

/// One Pareto point: the objective vector and the flow realizing it.
#[derive(Serialize, Debug, Clone)]
pub struct Solution {
    objectives: Vec<i64>,
    flow: Flow,
}

impl Solution {
    pub fn new(objectives: Vec<i64>, flow: Flow) -> Solution {
        Solution { objectives, flow }
    }

    pub fn objectives(&self) -> &[i64] {
        &self.objectives
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }
}
