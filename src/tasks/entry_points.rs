/* ********************************************************************** **
**  This file is part of msim.                                            **
**                                                                        **
**  msim is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of msim is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

use crate::FailResult;
use crate::env;
use crate::fsx;
use crate::jobs::{self, CommandSubmitter};
use crate::latex::{self, CellFormat};
use crate::lockfile::LockfilePath;
use crate::relax::{RelaxDriver, RunConfig, VasprunOracle};
use crate::resume::{self, ResumeFiles};
use crate::solver::CommandSolver;
use crate::ui::cli_deserialize::{CliDeserialize, LoggingArgs, ConfigArgs, DirArg};
use crate::util::ArgMatchesExt;
use crate::SpglibRefiner;

use clap::{App, Arg, ArgMatches};
use msim_tasks_config::{Relax, WarningPolicy};
use path_abs::PathFile;
use std::time::Duration;

fn wrap_result_main<F>(main: F)
where F: FnOnce() -> FailResult<()>,
{
    main().unwrap_or_else(|e| {
        for cause in e.iter_chain() {
            error!("{}", cause);
        }

        if env::rust_backtrace() {
            error!("{}", e.backtrace());
        } else {
            error!("(for more detail, try again with RUST_BACKTRACE=1)");
        }
        std::process::exit(1);
    });
}

fn app(name: &'static str, about: &'static str) -> App<'static, 'static> {
    App::new(name)
        .version(env!("CARGO_PKG_VERSION"))
        .about(about)
}

// -------------------------------------------------------------------------------------

/// Command line flags of `msim-relax` that override the settings file.
#[derive(Debug, Clone, Default)]
struct RelaxOverrides {
    max_iterations: Option<u32>,
    incar: Option<String>,
    refine: bool,
    run_static: bool,
    require_convergence: bool,
    warning_policy: Option<WarningPolicy>,
    nprocs: Option<u32>,
}

impl CliDeserialize for RelaxOverrides {
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.args(&[
            Arg::with_name("max_iterations")
                .short("n").long("max-iterations").value_name("N")
                .takes_value(true)
                .help("upper bound on solver runs in the loop"),
            Arg::with_name("incar")
                .long("incar").value_name("FILE")
                .takes_value(true)
                .help("control file to use for relaxation \
                       [default: INCAR-relax with --run-static, else INCAR]"),
            Arg::with_name("refine")
                .long("refine")
                .help("symmetrize the structure between runs (needs python3 with spglib)"),
            Arg::with_name("run_static")
                .long("run-static")
                .help("finish with a static run using INCAR-final"),
            Arg::with_name("require_convergence")
                .long("require-convergence")
                .help("skip the static run unless the relaxation actually converged"),
            Arg::with_name("warning_policy")
                .long("warning-policy").value_name("POLICY")
                .takes_value(true)
                .possible_values(&["stop", "continue"])
                .help("what to do when the solver log contains a warning"),
            Arg::with_name("nprocs")
                .long("nprocs").value_name("N")
                .takes_value(true)
                .help("process count substituted into the solver command [default: all CPUs]"),
        ])
    }

    fn _resolve_args(m: &ArgMatches<'_>) -> FailResult<Self> {
        Ok(RelaxOverrides {
            max_iterations: m.parse_value_of("max_iterations")?,
            incar: m.value_of("incar").map(Into::into),
            refine: m.is_present("refine"),
            run_static: m.is_present("run_static"),
            require_convergence: m.is_present("require_convergence"),
            warning_policy: match m.value_of("warning_policy") {
                None => None,
                Some("stop") => Some(WarningPolicy::Stop),
                Some("continue") => Some(WarningPolicy::Continue),
                Some(s) => bail!("invalid setting for --warning-policy: {:?}", s),
            },
            nprocs: m.parse_value_of("nprocs")?,
        })
    }
}

impl RelaxOverrides {
    fn apply(self, relax: &mut Relax) {
        if let Some(n) = self.max_iterations {
            relax.max_iterations = n;
        }
        if let Some(incar) = self.incar {
            relax.incar = Some(incar);
        }
        relax.refine |= self.refine;
        relax.run_static |= self.run_static;
        relax.final_static.require_convergence |= self.require_convergence;
        if let Some(policy) = self.warning_policy {
            relax.warning_policy = policy;
        }
        if let Some(n) = self.nprocs {
            relax.solver.nprocs = Some(n);
        }
    }
}

// %% CRATES: binary: msim-relax %%
pub fn relax() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-relax", "Relax a structure with VASP, resubmitting until it converges.")
        });
        let matches = app.get_matches();
        let (LoggingArgs, (ConfigArgs(mut settings), (DirArg(dir), overrides)))
            = de.resolve_args(&matches)?;

        RelaxOverrides::apply(overrides, &mut settings.relax);
        let settings = settings.validate()?;
        debug!("Settings:\n{}", msim_tasks_config::to_yaml_string(&settings)?);
        let relax = &settings.0.relax;

        let _lock = LockfilePath::in_dir(&dir).lock_or_fail()?;

        let nprocs = relax.solver.nprocs.unwrap_or_else(env::num_procs);
        let solver = CommandSolver::new(&relax.solver.command, nprocs, &relax.solver.log)?;
        info!("Solver command: {}", solver.argv().join(" "));

        let refiner = SpglibRefiner::new(relax.symmetry.symprec, relax.symmetry.angle_tolerance);
        if relax.refine {
            SpglibRefiner::check_availability()?;
        }

        let config = RunConfig::from_settings(&dir, relax);
        let outcome = RelaxDriver::new(config, solver, VasprunOracle, refiner).run()?;

        info!("Finished with status {} after {} solver runs.", outcome.status, outcome.invocations);
        if outcome.is_failure(relax.max_iterations) {
            let marker = dir.join(&relax.files.fail_log);
            warn!("Writing '{}'.", marker.display());
            fsx::write(&marker, "Relaxation failed.\n")?;
        }
        Ok(())
    });
}

// %% CRATES: binary: msim-resume-clean %%
pub fn resume_clean() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-resume-clean", "Clean a directory so that a paused relaxation can be resumed.")
                .args(&[
                    Arg::with_name("solver_log")
                        .long("solver-log").value_name("FILE")
                        .takes_value(true)
                        .help("log containing the solver's start banners [default: relax.solver.log]"),
                ])
        });
        let matches = app.get_matches();
        let (LoggingArgs, (ConfigArgs(settings), DirArg(dir))) = de.resolve_args(&matches)?;
        let settings = settings.validate()?;
        let settings = &settings.0;

        let solver_log = match matches.value_of("solver_log") {
            Some(log) => log.to_string(),
            None => settings.relax.solver.log.clone(),
        };
        let names = ResumeFiles {
            files: &settings.relax.files,
            solver_log: &solver_log,
            scheduler_stderr: &settings.jobs.stderr,
        };

        // the relaxation being resumed was killed while holding the lock
        let lock = LockfilePath::in_dir(&dir);
        lock.break_stale()?;
        let _lock = lock.lock_or_fail()?;
        let report = resume::clean_for_resume(&dir, &names)?;
        info!(
            "{} completed runs, the last archived as iteration {}; removed {} files.",
            report.completed_runs, report.last_archived, report.removed.len()
        );
        Ok(())
    });
}

// %% CRATES: binary: msim-job-script %%
pub fn job_script() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-job-script", "Create a Slurm job script which executes a given command.")
                .args(&[
                    Arg::with_name("job_name")
                        .short("j").long("job-name").value_name("NAME")
                        .takes_value(true)
                        .required(true)
                        .help("name of the job, and of its directory under work/"),
                    Arg::with_name("command")
                        .value_name("COMMAND")
                        .multiple(true)
                        .required(true)
                        .help("command run by the job"),
                ])
        });
        let matches = app.get_matches();
        let (LoggingArgs, (ConfigArgs(settings), DirArg(root))) = de.resolve_args(&matches)?;
        let settings = settings.validate()?;

        let name = matches.expect_value_of("job_name");
        let command = matches.expect_values_of("command").join(" ");
        info!("command  : {}", command);
        info!("job name : {}", name);

        let path = jobs::write_job_script(&root, &name, &command, &settings.0.jobs)?;
        info!("Wrote '{}'.", path.display());
        Ok(())
    });
}

// %% CRATES: binary: msim-submit-jobs %%
pub fn submit_jobs() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-submit-jobs", "Submit one SGE job per numbered directory.")
                .args(&[
                    Arg::with_name("min_id")
                        .long("min-id").value_name("ID")
                        .takes_value(true)
                        .required(true)
                        .help("first directory id"),
                    Arg::with_name("max_id")
                        .long("max-id").value_name("ID")
                        .takes_value(true)
                        .required(true)
                        .help("last directory id (inclusive)"),
                    Arg::with_name("queue")
                        .short("q").long("queue").value_name("QUEUE")
                        .takes_value(true)
                        .help("queue name [default: jobs.submit.queue]"),
                    Arg::with_name("prefix")
                        .long("prefix").value_name("PREFIX")
                        .takes_value(true)
                        .help("directory name prefix [default: jobs.submit.prefix]"),
                    Arg::with_name("id_digits")
                        .long("id-digits").value_name("N")
                        .takes_value(true)
                        .help("zero-padded width of directory ids [default: jobs.submit.id-digits]"),
                ])
        });
        let matches = app.get_matches();
        let (LoggingArgs, (ConfigArgs(mut settings), DirArg(root))) = de.resolve_args(&matches)?;

        let submit = &mut settings.jobs.submit;
        if let Some(queue) = matches.value_of("queue") {
            submit.queue = queue.to_string();
        }
        if let Some(prefix) = matches.value_of("prefix") {
            submit.prefix = prefix.to_string();
        }
        if let Some(digits) = matches.parse_value_of("id_digits")? {
            submit.id_digits = digits;
        }
        let settings = settings.validate()?;
        let jobs = &settings.0.jobs;

        let min_id = matches.parse_value_of("min_id")?.unwrap_or_else(|| panic!("BUG! (min_id was required)"));
        let max_id = matches.parse_value_of("max_id")?.unwrap_or_else(|| panic!("BUG! (max_id was required)"));

        let report = jobs::submit_jobs(
            &root, (min_id, max_id), &jobs.submit.queue,
            &jobs.submit, jobs,
            CommandSubmitter, Duration::from_millis(100),
        )?;
        info!("Submitted {} jobs; {} directories were missing.", report.submitted.len(), report.missing.len());
        Ok(())
    });
}

// %% CRATES: binary: msim-keep-resource %%
pub fn keep_resource() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-keep-resource", "Hold scheduler resources with placeholder jobs.")
                .args(&[
                    Arg::with_name("count")
                        .value_name("N_JOB")
                        .required(true)
                        .help("number of jobs to submit"),
                    Arg::with_name("partition")
                        .short("p").long("partition").value_name("PARTITIONS")
                        .takes_value(true)
                        .help("comma-separated partitions [default: jobs.keep-resource.partitions]"),
                ])
        });
        let matches = app.get_matches();
        let (LoggingArgs, (ConfigArgs(mut settings), DirArg(root))) = de.resolve_args(&matches)?;

        if let Some(partitions) = matches.value_of("partition") {
            settings.jobs.keep_resource.partitions = partitions.to_string();
        }
        let settings = settings.validate()?;
        let jobs = &settings.0.jobs;

        let count: u32 = matches.parse_value_of("count")?.unwrap_or_else(|| panic!("BUG! (count was required)"));
        let dirs = jobs::keep_resource(&root, count, &jobs.keep_resource, jobs, CommandSubmitter)?;
        info!("Submitted {} placeholder jobs.", dirs.len());
        Ok(())
    });
}

// %% CRATES: binary: msim-csv-to-latex %%
pub fn csv_to_latex() {
    wrap_result_main(|| {
        let (app, de) = CliDeserialize::augment_clap_app({
            app("msim-csv-to-latex", "Print a CSV file as LaTeX table code.")
                .args(&[
                    Arg::with_name("csv_file")
                        .value_name("CSV_FILE")
                        .required(true)
                        .help("input table; the first line is the header"),
                    Arg::with_name("formats")
                        .long("formats").value_name("FORMATS")
                        .takes_value(true)
                        .help("comma-separated per-column formats: plain, formula or equation \
                               (e.g. 'formula,plain,equation')"),
                ])
        });
        let matches = app.get_matches();
        let (LoggingArgs, ()) = de.resolve_args(&matches)?;

        let formats = match matches.value_of("formats") {
            Some(s) => s.split(',').map(|f| f.trim().parse()).collect::<FailResult<Vec<CellFormat>>>()?,
            None => vec![],
        };

        let input = PathFile::new(matches.expect_value_of("csv_file"))?;
        let lines = fsx::read_lines(&input)?;
        println!("{}", latex::create_formatted_latex_table(&lines, &formats)?);
        Ok(())
    });
}
