mod shared;

use crate::shared::{fresh_dir, read, write, exists, POSCAR};
use crate::shared::fakes::{FakeSolver, FakeOracle, IdentityRefiner, Run, Seen};

use msim_tasks::relax::{RelaxDriver, RelaxOutcome, RunConfig, RelaxState, StatusCode};
use msim_tasks_config::{Relax, WarningPolicy};
use pretty_assertions::assert_eq;
use std::path::Path;

fn relax(max_iterations: u32) -> Relax {
    let mut relax = Relax::default();
    relax.max_iterations = max_iterations;
    relax
}

fn run_driver(
    dir: &Path,
    relax: &Relax,
    solver: &mut FakeSolver,
    oracle: &mut FakeOracle,
) -> Result<RelaxOutcome, failure::Error> {
    let mut refiner = IdentityRefiner::default();
    let config = RunConfig::from_settings(dir, relax);
    RelaxDriver::new(config, solver, oracle, &mut refiner).run()
}

fn ids(outcome: &RelaxOutcome) -> Vec<u32>
{ outcome.records.iter().map(|r| r.id).collect() }

#[test]
fn single_shot_success() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![Run::ok("run1")]);
    let mut oracle = FakeOracle::default();

    let outcome = run_driver(dir, &relax(1), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.status, StatusCode::Success);
    assert_eq!(outcome.state, RelaxState::Stopped(StatusCode::Success));
    assert_eq!(outcome.invocations, 1);
    assert!(outcome.records.is_empty());
    assert!(!outcome.is_failure(1));

    // nothing is archived after a single run
    assert_eq!(read(dir, "POSCAR.init"), POSCAR);
    assert_eq!(read(dir, "POSCAR"), POSCAR);
    assert!(!exists(dir, "CONTCAR_01"));
    assert!(oracle.asked.is_empty());
}

#[test]
fn converges_on_third_run() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![Run::ok("run1"), Run::ok("run2"), Run::ok("run3")]);
    let mut oracle = FakeOracle::new(vec![false, true]);

    let outcome = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Converged);
    assert_eq!(outcome.status, StatusCode::Success);
    assert_eq!(outcome.invocations, 3);
    assert_eq!(ids(&outcome), vec![1, 2, 3]);
    assert!(!outcome.is_failure(10));

    // the first run of a call is never asked about
    assert_eq!(oracle.asked, vec![dir.join("vasprun_02.xml"), dir.join("vasprun_03.xml")]);

    assert_eq!(read(dir, "CONTCAR_01"), "CONTCAR from run1");
    assert_eq!(read(dir, "CONTCAR_03"), "CONTCAR from run3");
    assert_eq!(read(dir, "vasprun_02.xml"), "<modeling><!-- run2 --></modeling>");
    assert_eq!(read(dir, "POSCAR"), "CONTCAR from run3");
    assert_eq!(read(dir, "POSCAR.init"), POSCAR);
    assert!(!exists(dir, "CONTCAR_04"));
}

#[test]
fn error_stops_without_archiving() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![
        Run::ok("run1"),
        Run::ok("run2").with_line(" ERROR: charge density could not be read"),
    ]);
    let mut oracle = FakeOracle::new(vec![false]);

    let outcome = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Stopped(StatusCode::Error));
    assert_eq!(outcome.status, StatusCode::Error);
    assert_eq!(outcome.invocations, 2);
    assert_eq!(ids(&outcome), vec![1]);
    assert!(outcome.is_failure(10));

    assert_eq!(read(dir, "POSCAR"), "CONTCAR from run1");
    assert!(!exists(dir, "CONTCAR_02"));
    assert!(!exists(dir, "vasprun_02.xml"));
    assert!(oracle.asked.is_empty());
}

#[test]
fn nbands_beats_error() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![
        Run::ok("run1")
            .with_line(" ERROR: something else")
            .with_line(" Your NBANDS is smaller than the number of occupied bands"),
    ]);
    let mut oracle = FakeOracle::default();

    let outcome = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.status, StatusCode::NbandsMismatch);
    assert_eq!(outcome.invocations, 1);
    assert!(outcome.is_failure(10));
}

#[test]
fn single_shot_error_is_a_failure() {
    let tmp = fresh_dir();
    let mut solver = FakeSolver::new(vec![Run::ok("run1").with_line("ERROR")]);
    let mut oracle = FakeOracle::default();

    let outcome = run_driver(tmp.path(), &relax(1), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.status, StatusCode::Error);
    assert!(outcome.is_failure(1));
}

#[test]
fn warning_stops_by_default() {
    let tmp = fresh_dir();
    let mut solver = FakeSolver::new(vec![Run::ok("run1").with_line(" WARNING: Sub-Space-Matrix is not hermitian")]);
    let mut oracle = FakeOracle::default();

    let outcome = run_driver(tmp.path(), &relax(10), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Stopped(StatusCode::Warning));
    assert_eq!(outcome.invocations, 1);
    assert!(outcome.records.is_empty());
}

#[test]
fn warning_tolerated_when_asked() {
    let tmp = fresh_dir();
    let mut solver = FakeSolver::new(vec![
        Run::ok("run1").with_line(" WARNING: Sub-Space-Matrix is not hermitian"),
        Run::ok("run2"),
    ]);
    let mut oracle = FakeOracle::new(vec![true]);
    let mut settings = relax(10);
    settings.warning_policy = WarningPolicy::Continue;

    let outcome = run_driver(tmp.path(), &settings, &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Converged);
    assert_eq!(ids(&outcome), vec![1, 2]);
}

/// A directory set up for a relaxation followed by a static run.
fn static_dir() -> tempdir::TempDir {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "INCAR-relax", "relax incar");
    write(dir, "INCAR-final", "final incar");
    write(dir, "KPOINTS-relax", "relax kpoints");
    write(dir, "KPOINTS-final", "final kpoints");
    tmp
}

fn seen(incar: &str, kpoints: &str) -> Seen
{ Seen { incar: Some(incar.to_string()), kpoints: Some(kpoints.to_string()) } }

#[test]
fn static_run_follows_convergence() {
    let tmp = static_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![
        Run::ok("run1"),
        Run::ok("run2"),
        Run::ok("static").with_line(" ERROR: the static run is never classified"),
    ]);
    let mut oracle = FakeOracle::new(vec![true]);
    let mut settings = relax(10);
    settings.run_static = true;

    let outcome = run_driver(dir, &settings, &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Converged);
    assert_eq!(outcome.status, StatusCode::Success);
    assert!(outcome.static_run);
    assert_eq!(outcome.invocations, 3);
    assert_eq!(ids(&outcome), vec![1, 2]);
    assert_eq!(solver.seen, vec![
        seen("relax incar", "relax kpoints"),
        seen("relax incar", "relax kpoints"),
        seen("final incar", "final kpoints"),
    ]);
    // the static run is not archived
    assert!(!exists(dir, "vasprun_03.xml"));

    // nor does its ERROR reach the next call in this directory
    let mut solver = FakeSolver::new(vec![Run::ok("again")]);
    let outcome = run_driver(dir, &relax(1), &mut solver, &mut FakeOracle::default()).unwrap();
    assert_eq!(outcome.status, StatusCode::Success);
}

#[test]
fn static_run_after_exhaustion() {
    let tmp = static_dir();
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::new(vec![false]);
    let mut settings = relax(2);
    settings.run_static = true;

    let outcome = run_driver(tmp.path(), &settings, &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Stopped(StatusCode::Success));
    assert!(outcome.static_run);
    assert_eq!(outcome.invocations, 3);
    assert!(outcome.is_failure(2));
}

#[test]
fn static_run_can_require_convergence() {
    let tmp = static_dir();
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::new(vec![false]);
    let mut settings = relax(2);
    settings.run_static = true;
    settings.final_static.require_convergence = true;

    let outcome = run_driver(tmp.path(), &settings, &mut solver, &mut oracle).unwrap();
    assert!(!outcome.static_run);
    assert_eq!(outcome.invocations, 2);
}

#[test]
fn no_static_run_after_an_error() {
    let tmp = static_dir();
    let mut solver = FakeSolver::new(vec![Run::ok("run1").with_line("ERROR")]);
    let mut oracle = FakeOracle::default();
    let mut settings = relax(10);
    settings.run_static = true;

    let outcome = run_driver(tmp.path(), &settings, &mut solver, &mut oracle).unwrap();
    assert!(!outcome.static_run);
    assert_eq!(outcome.invocations, 1);
}

#[test]
fn missing_final_incar_is_an_error() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "INCAR-relax", "relax incar");
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::new(vec![true]);
    let mut settings = relax(10);
    settings.run_static = true;

    assert!(run_driver(dir, &settings, &mut solver, &mut oracle).is_err());
    assert_eq!(solver.seen.len(), 2);
}

#[test]
fn explicit_incar_is_staged() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "INCAR", "old");
    write(dir, "INCAR-custom", "custom");
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::default();
    let mut settings = relax(1);
    settings.incar = Some("INCAR-custom".to_string());

    run_driver(dir, &settings, &mut solver, &mut oracle).unwrap();
    assert_eq!(solver.seen[0].incar.as_ref().map(|s| &s[..]), Some("custom"));
    // without a static run, KPOINTS is left alone
    assert_eq!(solver.seen[0].kpoints, None);
}

#[test]
fn resumes_after_existing_snapshots() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "vasprun_01.xml", "old");
    write(dir, "vasprun_02.xml", "old");
    let mut solver = FakeSolver::new(vec![Run::ok("run3"), Run::ok("run4")]);
    let mut oracle = FakeOracle::new(vec![true]);

    let outcome = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap();
    assert_eq!(outcome.state, RelaxState::Converged);
    assert_eq!(ids(&outcome), vec![3, 4]);
    assert_eq!(oracle.asked, vec![dir.join("vasprun_04.xml")]);
    assert_eq!(read(dir, "CONTCAR_03"), "CONTCAR from run3");
    assert_eq!(read(dir, "vasprun_01.xml"), "old");

    // the initial structure belongs to the first call only
    assert!(!exists(dir, "POSCAR.init"));
}

#[test]
fn malformed_snapshot_name_is_an_error() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "vasprun_final.xml", "");
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::default();

    let err = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap_err();
    assert!(err.to_string().contains("vasprun_final.xml"), "{}", err);
    assert!(solver.seen.is_empty());
}

#[test]
fn largest_snapshot_id_is_an_error() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    write(dir, "vasprun_4294967295.xml", "");
    let mut solver = FakeSolver::new(vec![]);
    let mut oracle = FakeOracle::default();

    let err = run_driver(dir, &relax(10), &mut solver, &mut oracle).unwrap_err();
    assert!(err.to_string().contains("4294967295"), "{}", err);
    assert!(solver.seen.is_empty());
}

#[test]
fn old_log_lines_are_not_reclassified() {
    let tmp = fresh_dir();
    let dir = tmp.path();

    let mut solver = FakeSolver::new(vec![Run::ok("run1").with_line("ERROR")]);
    let outcome = run_driver(dir, &relax(10), &mut solver, &mut FakeOracle::default()).unwrap();
    assert_eq!(outcome.status, StatusCode::Error);

    // the ERROR line is still in the log, but it was already seen
    let mut solver = FakeSolver::new(vec![Run::ok("run2")]);
    let outcome = run_driver(dir, &relax(1), &mut solver, &mut FakeOracle::default()).unwrap();
    assert_eq!(outcome.status, StatusCode::Success);
    assert!(read(dir, "vasp.log").contains("ERROR"));
}

#[test]
fn refinement_rewrites_the_next_input() {
    let tmp = fresh_dir();
    let dir = tmp.path();
    let mut solver = FakeSolver::new(vec![
        Run::ok("run1").with_contcar(POSCAR),
        Run::ok("run2").with_contcar(POSCAR),
    ]);
    let mut oracle = FakeOracle::new(vec![true]);
    let mut refiner = IdentityRefiner::default();
    let mut settings = relax(10);
    settings.refine = true;

    let config = RunConfig::from_settings(dir, &settings);
    let outcome = RelaxDriver::new(config, &mut solver, &mut oracle, &mut refiner).run().unwrap();
    assert_eq!(outcome.state, RelaxState::Converged);
    assert_eq!(refiner.calls, 2);

    // snapshots keep the solver's output; only POSCAR is reduced
    assert_eq!(read(dir, "CONTCAR_02"), POSCAR);
    let poscar = read(dir, "POSCAR");
    assert_ne!(poscar, POSCAR);
    assert!(poscar.starts_with("Al Pt"));
}

#[test]
fn refinement_of_garbage_is_an_error() {
    let tmp = fresh_dir();
    let mut solver = FakeSolver::new(vec![Run::ok("run1")]);
    let mut oracle = FakeOracle::default();
    let mut settings = relax(10);
    settings.refine = true;

    assert!(run_driver(tmp.path(), &settings, &mut solver, &mut oracle).is_err());
}
