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

//! All of the checking that happens after command line flags have been merged in.

use crate::config::*;
use failure::Error;

impl Settings {
    pub fn validate(self) -> Result<ValidatedSettings, Error> {
        check_relax(&self.relax)?;
        check_jobs(&self.jobs)?;
        Ok(ValidatedSettings(self))
    }
}

fn check_relax(relax: &Relax) -> Result<(), Error> {
    ensure!(relax.max_iterations >= 1, "relax.max-iterations must be at least 1.");

    ensure!(
        relax.solver.command.split_whitespace().next().is_some(),
        "relax.solver.command is empty."
    );
    if let Some(nprocs) = relax.solver.nprocs {
        ensure!(nprocs >= 1, "relax.solver.nprocs must be at least 1.");
    }

    let LogPatterns { error, warning, nbands } = &relax.log_patterns;
    for (class, patterns) in &[("error", error), ("warning", warning), ("nbands", nbands)] {
        if patterns.iter().any(|p| p.is_empty()) {
            bail!("relax.log-patterns.{} contains an empty pattern, which would match every line.", class);
        }
    }

    if relax.refine {
        ensure!(relax.symmetry.symprec > 0.0, "relax.symmetry.symprec must be positive.");
    }

    if relax.final_static.require_convergence && !relax.run_static {
        warn!("relax.final-static.require-convergence has no effect without relax.run-static.");
    }
    if relax.max_iterations == 1 && relax.refine {
        warn!("relax.refine has no effect with max-iterations: 1, since nothing is archived.");
    }

    let files = &relax.files;
    ensure!(
        files.contcar != files.poscar,
        "relax.files.contcar and relax.files.poscar must differ."
    );
    ensure!(
        files.vasprun.contains('.') && !files.vasprun.starts_with('.'),
        "relax.files.vasprun must have an extension (it is used to name snapshots)."
    );
    Ok(())
}

fn check_jobs(jobs: &Jobs) -> Result<(), Error> {
    ensure!(!jobs.shell.trim().is_empty(), "jobs.shell is empty.");
    ensure!(jobs.submit.id_digits >= 1, "jobs.submit.id-digits must be at least 1.");
    ensure!(
        jobs.submit.command.split_whitespace().next().is_some(),
        "jobs.submit.command is empty."
    );
    ensure!(
        jobs.keep_resource.command.split_whitespace().next().is_some(),
        "jobs.keep-resource.command is empty."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut settings = Settings::default();
        settings.relax.max_iterations = 0;
        let msg = settings.validate().unwrap_err().to_string();
        assert!(msg.contains("max-iterations"), "{}", msg);
    }

    #[test]
    fn empty_pattern_rejected() {
        let mut settings = Settings::default();
        settings.relax.log_patterns.warning = vec!["".into()];
        let msg = settings.validate().unwrap_err().to_string();
        assert!(msg.contains("log-patterns.warning"), "{}", msg);
    }

    #[test]
    fn empty_pattern_list_allowed() {
        let mut settings = Settings::default();
        settings.relax.log_patterns.nbands = vec![];
        settings.validate().unwrap();
    }

    #[test]
    fn vasprun_needs_extension() {
        let mut settings = Settings::default();
        settings.relax.files.vasprun = "vasprun".into();
        assert!(settings.validate().is_err());
    }
}
