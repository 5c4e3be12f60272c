//! A uniform incremental SAT facade over several engines.
//!
//! Sessions are created through an [`EngineRegistry`] (or directly with [`Session::new`]) from an [`EngineConfig`].
//! Whatever the engine, they are driven with the same operations and report results with the same conventions;
//! operations an engine does not provide return [`SatError::Unsupported`] errors.

mod batch;
pub use batch::LiteralBatch;

mod batsat_solver;
pub use batsat_solver::BatsatSolver;

mod buffered_sat_solver;
pub use buffered_sat_solver::BufferedSatSolver;
pub use buffered_sat_solver::DimacsInstanceRead;
pub use buffered_sat_solver::SolvingFn;

mod cadical_solver;
pub use cadical_solver::cadical_signature;
pub use cadical_solver::CadicalSolver;

mod cardinality;
pub use cardinality::declare_totalizer;
pub use cardinality::Cardinality;

mod codec;
pub use codec::LiteralCodec;

mod config;
pub use config::EngineConfig;
pub use config::EngineKind;

mod engine;
pub use engine::Budget;
pub use engine::BudgetKind;
pub use engine::Engine;
pub use engine::Interrupter;
pub use engine::SimplifyPolicy;
pub use engine::Statistic;
pub use engine::VarOptions;

mod error;
pub use error::Result;
pub use error::SatError;

mod external_sat_solver;
pub use external_sat_solver::ExternalSatSolver;

mod ipasir_sat_solver;
pub use ipasir_sat_solver::ipasir_signature;
pub use ipasir_sat_solver::IpasirSatSolver;

mod literal;
pub use literal::Literal;
pub use literal::Variable;

mod model;
pub use model::Model;
pub use model::SolvingResult;
pub use model::Value;

mod ops;
pub use ops::AllSolutions;

mod portfolio_solver;
pub use portfolio_solver::PortfolioSolver;

mod registry;
pub use registry::EngineRegistry;
pub use registry::Handle;

mod session;
pub use session::Session;
pub use session::SessionState;
pub use session::SimpStrategy;
pub use session::SolvingListener;

mod varisat_solver;
pub use varisat_solver::VarisatSolver;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clause;
    use paste::paste;

    fn pigeon_hole_clauses(n: usize) -> Vec<Vec<Literal>> {
        let var = |p: usize, h: usize| Variable::from(p * n + h + 1);
        let mut clauses = (0..=n)
            .map(|p| (0..n).map(|h| var(p, h).positive()).collect())
            .collect::<Vec<Vec<Literal>>>();
        for h in 0..n {
            for p1 in 0..=n {
                for p2 in p1 + 1..=n {
                    clauses.push(vec![var(p1, h).negative(), var(p2, h).negative()]);
                }
            }
        }
        clauses
    }

    /// Adds the clauses stating that `n+1` pigeons fit in `n` holes.
    pub(crate) fn add_pigeon_hole_clauses(engine: &mut dyn Engine, n: usize) {
        let codec = engine.codec();
        for _ in 0..(n + 1) * n {
            engine.new_var(VarOptions::default()).unwrap();
        }
        for cl in pigeon_hole_clauses(n) {
            let lits = cl.iter().map(|l| codec.encode(*l)).collect::<Vec<i64>>();
            engine.add_clause(&lits).unwrap();
        }
    }

    pub(crate) fn add_pigeon_hole_clauses_to_session(session: &mut Session, n: usize) {
        session.reserve_vars((n + 1) * n).unwrap();
        for cl in pigeon_hole_clauses(n) {
            session.add_clause(&cl).unwrap();
        }
    }

    fn new_session(kind: EngineKind) -> Session {
        Session::new(EngineConfig::new(kind)).unwrap()
    }

    macro_rules! engine_tests {
        ($engine:ident, $kind:expr) => {
            paste! {
                #[test]
                fn [<test_ $engine _n_vars>]() {
                    let mut s = new_session($kind);
                    assert_eq!(0, s.n_vars());
                    for i in 1..=5 {
                        assert_eq!(Variable::from(i), s.new_var_default().unwrap());
                    }
                    assert_eq!(5, s.n_vars());
                    s.reserve_vars(3).unwrap();
                    assert_eq!(5, s.n_vars());
                }

                #[test]
                fn [<test_ $engine _empty_clause>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(2).unwrap();
                    s.add_binary(1.into(), 2.into()).unwrap();
                    assert!(!s.add_empty_clause().unwrap());
                    assert!(!s.okay());
                    assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
                }

                #[test]
                fn [<test_ $engine _unit_clause>]() {
                    let mut s = new_session($kind);
                    let v = s.new_var_default().unwrap();
                    assert!(s.add_unit(v.positive()).unwrap());
                    assert_eq!(SolvingResult::Satisfiable, s.solve().unwrap());
                    assert_eq!(Value::True, s.value(v.positive()).unwrap());
                    assert_eq!(Value::False, s.value(v.negative()).unwrap());
                }

                #[test]
                fn [<test_ $engine _contradiction>]() {
                    let mut s = new_session($kind);
                    let v = s.new_var_default().unwrap();
                    s.add_unit(v.positive()).unwrap();
                    s.add_unit(v.negative()).unwrap();
                    assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
                    assert!(!s.okay());
                    assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
                }

                #[test]
                fn [<test_ $engine _negative_literal_values>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(2).unwrap();
                    s.add_unit((-1).into()).unwrap();
                    s.add_clause(&clause![1, 2]).unwrap();
                    assert_eq!(SolvingResult::Satisfiable, s.solve().unwrap());
                    assert_eq!(Value::False, s.value(1.into()).unwrap());
                    assert_eq!(Value::True, s.value((-1).into()).unwrap());
                    assert_eq!(Value::True, s.value(2.into()).unwrap());
                    assert_eq!(Value::False, s.value((-2).into()).unwrap());
                }

                #[test]
                fn [<test_ $engine _incremental_assumptions>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(2).unwrap();
                    s.add_clause(&clause![1, 2]).unwrap();
                    assert_eq!(SolvingResult::Satisfiable, s.solve_with(&clause![-1]).unwrap());
                    assert_eq!(Value::True, s.value(2.into()).unwrap());
                    assert_eq!(Value::False, s.value(1.into()).unwrap());
                    assert_eq!(
                        SolvingResult::Unsatisfiable,
                        s.solve_with(&clause![-1, -2]).unwrap()
                    );
                    assert!(s.okay());
                    assert_eq!(SolvingResult::Satisfiable, s.solve().unwrap());
                }

                #[test]
                fn [<test_ $engine _model>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(3).unwrap();
                    s.add_clause(&clause![1]).unwrap();
                    s.add_clause(&clause![-2]).unwrap();
                    s.add_clause(&clause![3, -1]).unwrap();
                    assert_eq!(SolvingResult::Satisfiable, s.solve().unwrap());
                    let model = s.model().unwrap();
                    assert_eq!(4, model.as_slice().len());
                    assert_eq!(Value::Unknown, model.as_slice()[0]);
                    assert!(model.is_complete());
                    assert_eq!(vec![true, false, true], model.to_bools(false));
                    for (v, value) in model.iter() {
                        assert_eq!(value, s.value(Variable::from(v).positive()).unwrap());
                    }
                }

                #[test]
                fn [<test_ $engine _wide_clauses>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(6).unwrap();
                    s.add_clause(&clause![-6, 5, -4, 3, -2, 1]).unwrap();
                    s.add_ternary((-1).into(), 2.into(), (-3).into()).unwrap();
                    assert_eq!(
                        SolvingResult::Satisfiable,
                        s.solve_with(&clause![6, -5, 4, -3, 2]).unwrap()
                    );
                    assert_eq!(Value::True, s.value(1.into()).unwrap());
                    assert_eq!(
                        SolvingResult::Unsatisfiable,
                        s.solve_with(&clause![6, -5, 4, -3, 2, -1]).unwrap()
                    );
                }

                #[test]
                fn [<test_ $engine _pigeon_hole>]() {
                    let mut s = new_session($kind);
                    add_pigeon_hole_clauses_to_session(&mut s, 4);
                    assert_eq!(SolvingResult::Unsatisfiable, s.solve().unwrap());
                }

                #[test]
                fn [<test_ $engine _unallocated>]() {
                    let mut s = new_session($kind);
                    s.reserve_vars(1).unwrap();
                    assert!(s.add_clause(&clause![2]).unwrap_err().is_invalid_usage());
                    assert!(s.solve_with(&clause![-2]).unwrap_err().is_invalid_usage());
                }
            }
        };
    }

    engine_tests!(batsat, EngineKind::Batsat);
    engine_tests!(varisat, EngineKind::Varisat);
    engine_tests!(cadical, EngineKind::Cadical);
    engine_tests!(portfolio, EngineKind::Portfolio);

    #[test]
    fn test_interrupt_long_solve() {
        for kind in [EngineKind::Batsat, EngineKind::Cadical, EngineKind::Portfolio] {
            let mut s = new_session(kind);
            add_pigeon_hole_clauses_to_session(&mut s, 12);
            s.interrupt().unwrap();
            assert_eq!(SolvingResult::Unknown, s.solve().unwrap());
            s.clear_interrupt();
        }
    }
}
