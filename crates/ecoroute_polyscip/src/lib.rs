use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use ecoroute_flow::problem::{FlowProblem, FrontMode};
use ecoroute_flow::solution::Solution;
use ecoroute_flow::solver::{MultiObjectiveSolver, SolverError};

pub mod mop;
pub mod solution_file;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Slack past the solver's own time limit before the process is killed.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// PolySCIP backend: writes the problem file into a working directory, runs
/// the solver process and parses the solution file it leaves behind.
pub struct PolyscipSolver {
    binary: PathBuf,
    work_dir: PathBuf,
    time_limit: Option<Duration>,
}

impl PolyscipSolver {
    pub fn new(work_dir: impl Into<PathBuf>) -> PolyscipSolver {
        PolyscipSolver {
            binary: PathBuf::from("polyscip"),
            work_dir: work_dir.into(),
            time_limit: None,
        }
    }

    pub fn set_binary(&mut self, binary: impl Into<PathBuf>) -> &mut PolyscipSolver {
        self.binary = binary.into();
        self
    }

    pub fn set_time_limit(&mut self, time_limit: Duration) -> &mut PolyscipSolver {
        self.time_limit = Some(time_limit);
        self
    }

    fn run(&self, problem_file: &Path, mode: FrontMode) -> Result<(), SolverError> {
        let mut command = Command::new(&self.binary);
        command.arg(problem_file);
        if mode == FrontMode::ExtremalOnly {
            command.arg("-x");
        }
        command.arg("-w");
        if let Some(limit) = self.time_limit {
            command.args(["-t", &limit.as_secs().max(1).to_string()]);
        }
        command
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(binary = %self.binary.display(), file = %problem_file.display(), "launching solver");
        let mut child = command.spawn().map_err(SolverError::Launch)?;

        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || {
            let mut buffer = String::new();
            if let Some(mut stderr) = stderr {
                use std::io::Read;
                let _ = stderr.read_to_string(&mut buffer);
            }
            buffer
        });

        let started = Instant::now();
        let deadline = self.time_limit.map(|limit| limit + KILL_GRACE);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(deadline) = deadline {
                if started.elapsed() > deadline {
                    // past the deadline nothing the solver wrote can be
                    // trusted
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SolverError::Timeout(deadline));
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader.join().unwrap_or_default();
        if !status.success() {
            return Err(SolverError::Failed {
                status: status.to_string(),
                stderr,
            });
        }
        info!(elapsed = ?started.elapsed(), "solver finished");
        Ok(())
    }
}

impl MultiObjectiveSolver for PolyscipSolver {
    fn solve(&self, problem: &FlowProblem) -> Result<Vec<Solution>, SolverError> {
        std::fs::create_dir_all(&self.work_dir)?;
        let problem_file = PathBuf::from(format!("{}.mop", problem.name()));
        std::fs::write(
            self.work_dir.join(&problem_file),
            mop::render_problem(problem),
        )?;

        self.run(&problem_file, problem.mode())?;

        let solution_path = self
            .work_dir
            .join(format!("solutions_{}.txt", problem.name()));
        let text = match std::fs::read_to_string(&solution_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SolverError::MissingOutput(
                    solution_path.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let solutions = solution_file::parse_solutions(&text, problem)?;
        info!(solutions = solutions.len(), "parsed solver output");
        Ok(solutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecoroute_flow::demand::{Demand, DemandEntry};
    use ecoroute_flow::problem::Objective;
    use ecoroute_network::capacity::CapacityPolicy;
    use ecoroute_network::graph::{Graph, LinkSpec};
    use ecoroute_network::link::LinkKind;

    fn problem() -> FlowProblem {
        let mut builder = Graph::builder();
        builder
            .add_link(LinkSpec {
                id: "ab".to_string(),
                from: "A".to_string(),
                to: "B".to_string(),
                kind: LinkKind::Road,
                lanes: 1,
                length: 5.0,
                speed: 15.0,
            })
            .unwrap();
        let graph = builder.build(&CapacityPolicy::UnitRate);
        let demand = Demand::new(vec![DemandEntry::new(
            1,
            0.0,
            "Car",
            graph.node_by_name("A").unwrap(),
            graph.node_by_name("B").unwrap(),
        )]);
        FlowProblem::builder(&graph)
            .set_demand(&demand)
            .set_objectives(vec![Objective::new("length", 1)])
            .build()
            .unwrap()
    }

    #[test]
    fn missing_binary_is_a_transient_launch_failure() {
        let work_dir = std::env::temp_dir().join("ecoroute_polyscip_launch_test");
        let mut solver = PolyscipSolver::new(&work_dir);
        solver.set_binary("ecoroute-no-such-solver-binary");
        let err = solver.solve(&problem()).unwrap_err();
        assert!(matches!(err, SolverError::Launch(_)));
        assert!(err.is_transient());
    }
}
