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

//! Batch job scripts, and handing them to the scheduler.

use crate::FailResult;
use crate::fsx;

use msim_tasks_config::{Jobs, Submit, KeepResource};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

pub const JOB_SCRIPT: &str = "job.sh";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scheduler {
    Slurm,
    Sge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobScript {
    pub scheduler: Scheduler,
    pub name: String,
    pub shell: String,
    pub stdout: String,
    pub stderr: String,
    /// Size of the SGE parallel environment. Ignored by Slurm.
    pub cores: Option<u32>,
    pub preamble: Vec<String>,
    pub command: String,
}

impl JobScript {
    pub fn slurm(name: &str, command: &str, jobs: &Jobs) -> Self {
        JobScript {
            scheduler: Scheduler::Slurm,
            name: name.to_string(),
            shell: jobs.shell.clone(),
            stdout: jobs.stdout.clone(),
            stderr: jobs.stderr.clone(),
            cores: None,
            preamble: jobs.preamble.clone(),
            command: command.to_string(),
        }
    }

    pub fn sge(name: &str, cores: u32, command: &str, jobs: &Jobs) -> Self {
        JobScript {
            scheduler: Scheduler::Sge,
            cores: Some(cores),
            ..JobScript::slurm(name, command, jobs)
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![];
        match self.scheduler {
            Scheduler::Slurm => {
                lines.push(format!("#!{}", self.shell));
                lines.push(format!("#SBATCH -J {}", self.name));
                lines.push("#SBATCH --nodes=1".to_string());
                lines.push(format!("#SBATCH -o {}", self.stdout));
                lines.push(format!("#SBATCH -e {}", self.stderr));
                lines.push("#SBATCH --open-mode=append".to_string());
                lines.push(String::new());
            },
            Scheduler::Sge => {
                let rule = "#".repeat(71);
                lines.push(rule.clone());
                lines.push(format!("#$ -S {}", self.shell));
                lines.push("#$ -cwd".to_string());
                lines.push(format!("#$ -N {}", self.name));
                lines.push(format!("#$ -o {}", self.stdout));
                lines.push(format!("#$ -e {}", self.stderr));
                if let Some(cores) = self.cores {
                    lines.push(format!("#$ -pe mpi* {}", cores));
                }
                lines.push(rule);
            },
        }
        lines.extend(self.preamble.iter().cloned());
        lines.push(self.command.clone());
        lines.push(String::new());
        lines.join("\n")
    }

    pub fn write(&self, dir: &Path) -> FailResult<PathBuf> {
        let path = dir.join(JOB_SCRIPT);
        fsx::write(&path, self.render())?;
        Ok(path)
    }
}

//--------------------------------------------------------

#[derive(Debug, Fail)]
#[fail(display = "submission command `{}` failed ({}): {}", command, status, stderr)]
pub struct SubmissionFailed {
    command: String,
    status: String,
    stderr: String,
}

/// Hands a job script to the scheduler.
pub trait Submitter {
    /// Run `argv` with `dir` as its working directory.
    fn submit(&mut self, argv: &[String], dir: &Path) -> FailResult<()>;
}

impl<'a, S: Submitter + ?Sized> Submitter for &'a mut S {
    fn submit(&mut self, argv: &[String], dir: &Path) -> FailResult<()>
    { (**self).submit(argv, dir) }
}

/// Runs the submission command for real.
#[derive(Debug, Default, Clone)]
pub struct CommandSubmitter;

impl Submitter for CommandSubmitter {
    fn submit(&mut self, argv: &[String], dir: &Path) -> FailResult<()> {
        ensure!(!argv.is_empty(), "(BUG!) empty submission command");
        let command = argv.join(" ");

        let output = {
            process::Command::new(&argv[0])
                .args(&argv[1..])
                .current_dir(dir)
                .output()
                .map_err(|e| SubmissionFailed {
                    command: command.clone(),
                    status: "could not start".into(),
                    stderr: e.to_string(),
                })?
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output.status.to_string();
            return Err(SubmissionFailed { command, status, stderr }.into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            info!("{}", line);
        }
        Ok(())
    }
}

//--------------------------------------------------------

/// Creates `<root>/work/<name>/job.sh` running `command`.
pub fn write_job_script(root: &Path, name: &str, command: &str, jobs: &Jobs) -> FailResult<PathBuf> {
    ensure!(!command.trim().is_empty(), "no command given for the job script");
    ensure!(!name.is_empty() && !name.contains('/'), "bad job name: {:?}", name);

    let pool = root.join("work");
    if !pool.exists() {
        info!("Creating '{}'.", pool.display());
        fsx::create_dir(&pool)?;
    }
    let dir = pool.join(name);
    ensure!(!dir.exists(), "job directory '{}' already exists", dir.display());
    fsx::create_dir(&dir)?;

    JobScript::slurm(name, command, jobs).write(&dir)
}

/// `prefix` followed by `id` zero-padded to `digits`.
pub fn numbered_dir_name(prefix: &str, id: u32, digits: usize) -> String
{ format!("{}{:0width$}", prefix, id, width = digits) }

/// Which directories `submit_jobs` submitted from, and which it skipped.
#[derive(Serialize)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitReport {
    pub submitted: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

/// One SGE job per existing directory in `prefix{min..=max}`.
pub fn submit_jobs(
    root: &Path,
    (min_id, max_id): (u32, u32),
    queue: &str,
    settings: &Submit,
    jobs: &Jobs,
    mut submitter: impl Submitter,
    pause: Duration,
) -> FailResult<SubmitReport> {
    ensure!(min_id <= max_id, "empty id range {}..={}", min_id, max_id);

    let cores = settings.cores_for(queue);
    let preamble = {
        let mut lines = vec![
            "# save initial structure".to_string(),
            "cp -rf POSCAR POSCAR.init".to_string(),
            String::new(),
        ];
        lines.extend(jobs.preamble.iter().cloned());
        lines
    };

    let mut report = SubmitReport::default();
    for id in min_id..=max_id {
        let name = numbered_dir_name(&settings.prefix, id, settings.id_digits);
        let dir = root.join(&name);
        if !dir.is_dir() {
            debug!("skipping missing directory '{}'", dir.display());
            report.missing.push(dir);
            continue;
        }

        let script = JobScript {
            preamble: preamble.clone(),
            ..JobScript::sge(&name, cores, &settings.command, jobs)
        };
        script.write(&dir)?;

        let argv = vec!["qsub".to_string(), "-q".to_string(), queue.to_string(), JOB_SCRIPT.to_string()];
        info!("Submitting {} to {} ({} cores).", name, queue, cores);
        submitter.submit(&argv, &dir)?;
        report.submitted.push(dir);

        thread::sleep(pause);
    }
    Ok(report)
}

/// Submits `count` placeholder jobs from `<root>/resource_keeper/<NN>`.
pub fn keep_resource(
    root: &Path,
    count: u32,
    settings: &KeepResource,
    jobs: &Jobs,
    mut submitter: impl Submitter,
) -> FailResult<Vec<PathBuf>> {
    let keeper = root.join("resource_keeper");
    fsx::create_dir(&keeper)?;

    let mut dirs = vec![];
    for i in 1..=count {
        let id = format!("{:02}", i);
        let dir = keeper.join(&id);
        fsx::create_dir(&dir)?;

        JobScript::slurm(&format!("test-{}", id), &settings.command, jobs).write(&dir)?;

        let argv = vec!["sbatch".to_string(), "-p".to_string(), settings.partitions.clone(), JOB_SCRIPT.to_string()];
        submitter.submit(&argv, &dir)?;
        dirs.push(dir);
    }
    Ok(dirs)
}
