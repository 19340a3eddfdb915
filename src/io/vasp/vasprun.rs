/* ************************************************************************ **
** This file is part of msim, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of msim is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

use crate::FailResult;

use regex::Regex;
use std::path::Path;

/// A trajectory file that was cut short or is missing a parameter we need.
#[derive(Debug, Fail)]
#[fail(display = "malformed vasprun file '{}': {}", path, reason)]
pub struct MalformedVasprun {
    pub path: String,
    pub reason: String,
}

/// Ionic relaxation parameters and progress, as recorded in vasprun.xml.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IonicInfo {
    /// Maximum number of ionic steps requested.
    pub nsw: i64,
    /// Ionic update algorithm. 0 is molecular dynamics.
    pub ibrion: i64,
    /// Number of `<calculation>` blocks, one per ionic step taken.
    pub ionic_steps: usize,
}

impl IonicInfo {
    /// Whether the ionic relaxation finished before running out of steps.
    ///
    /// A run with `NSW <= 1` has no ionic loop to speak of and always counts
    /// as converged. Molecular dynamics is converged once it has taken every
    /// step; anything else is converged if it stopped early.
    pub fn converged(&self) -> bool {
        let nsw = self.nsw;
        let steps = self.ionic_steps as i64;
        if nsw <= 1 {
            true
        } else if self.ibrion == 0 {
            steps == nsw
        } else {
            steps < nsw
        }
    }
}

lazy_static! {
    static ref RE_PARAMETERS: Regex = Regex::new(r"(?s)<parameters>(.*?)</parameters>").unwrap();
    static ref RE_NSW: Regex = int_param_regex("NSW");
    static ref RE_IBRION: Regex = int_param_regex("IBRION");
    static ref RE_CALCULATION: Regex = Regex::new(r"<calculation\b").unwrap();
    static ref RE_END: Regex = Regex::new(r"</modeling>\s*$").unwrap();
}

fn int_param_regex(name: &str) -> Regex {
    let pattern = format!(r#"<i\b[^>]*\bname="{}"[^>]*>\s*(-?\d+)\s*</i>"#, name);
    Regex::new(&pattern).unwrap()
}

pub fn read_ionic_info(path: impl AsRef<Path>) -> FailResult<IonicInfo> {
    let path = path.as_ref();
    let text = msim_fs_util::read_to_string(path)?;
    parse_ionic_info(&text).map_err(|reason| {
        MalformedVasprun { path: path.display().to_string(), reason }.into()
    })
}

pub fn read_convergence(path: impl AsRef<Path>) -> FailResult<bool> {
    let path = path.as_ref();
    let info = read_ionic_info(path)?;
    debug!(
        "{}: NSW = {}, IBRION = {}, {} ionic steps",
        path.display(), info.nsw, info.ibrion, info.ionic_steps,
    );
    Ok(info.converged())
}

pub(crate) fn parse_ionic_info(text: &str) -> Result<IonicInfo, String> {
    if !RE_END.is_match(text) {
        return Err("no closing </modeling> tag; was the run interrupted?".into());
    }

    // INCAR echoes appear before <parameters>, so prefer the block VASP
    // actually used and only fall back to the first mention anywhere.
    let params = RE_PARAMETERS.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    let find_int = |re: &Regex| -> Result<Option<i64>, String> {
        let caps = params.and_then(|p| re.captures(p)).or_else(|| re.captures(text));
        match caps {
            None => Ok(None),
            Some(caps) => caps[1].parse().map(Some).map_err(|e| format!("{}: {:?}", e, &caps[1])),
        }
    };

    let nsw = find_int(&RE_NSW)?.ok_or_else(|| "NSW not found".to_string())?;
    let ibrion = match find_int(&RE_IBRION)? {
        Some(ibrion) => ibrion,
        None => match nsw {
            -1 | 0 => -1,
            _ => 0,
        },
    };
    let ionic_steps = RE_CALCULATION.find_iter(text).count();

    Ok(IonicInfo { nsw, ibrion, ionic_steps })
}
