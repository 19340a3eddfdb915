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

use msim_tasks_config::LogPatterns;
use std::fmt;

/// What the solver log says about the most recent run.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCode {
    Success,
    Warning,
    Error,
    /// VASP complained about the number of bands. Retrying with the same
    /// input cannot help, so this is treated like an error.
    NbandsMismatch,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::Warning => "WARNING",
            StatusCode::Error => "ERROR",
            StatusCode::NbandsMismatch => "NBANDS-MISMATCH",
        };
        f.write_str(s)
    }
}

/// Scans solver log lines for case-insensitive substrings.
#[derive(Debug, Clone)]
pub struct LogClassifier {
    error: Vec<String>,
    warning: Vec<String>,
    nbands: Vec<String>,
}

impl LogClassifier {
    pub fn new(patterns: &LogPatterns) -> Self {
        let lower = |v: &[String]| -> Vec<String> { v.iter().map(|s| s.to_lowercase()).collect() };
        LogClassifier {
            error: lower(&patterns.error),
            warning: lower(&patterns.warning),
            nbands: lower(&patterns.nbands),
        }
    }

    /// Classify lines appended to the log since the last check.
    ///
    /// An NBANDS line ends the scan immediately. Otherwise ERROR beats WARNING
    /// regardless of which came first, and no match at all is SUCCESS.
    pub fn classify<S: AsRef<str>>(&self, lines: &[S]) -> StatusCode {
        let mut status = StatusCode::Success;
        for line in lines {
            let line = line.as_ref().to_lowercase();
            let hit = |patterns: &[String]| patterns.iter().any(|p| line.contains(&p[..]));

            if hit(&self.nbands) {
                return StatusCode::NbandsMismatch;
            } else if hit(&self.error) {
                status = StatusCode::Error;
            } else if hit(&self.warning) && status != StatusCode::Error {
                status = StatusCode::Warning;
            }
        }
        status
    }
}

impl Default for LogClassifier {
    fn default() -> Self { LogClassifier::new(&LogPatterns::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(lines: &[&str]) -> StatusCode {
        LogClassifier::default().classify(lines)
    }

    #[test]
    fn quiet_log_is_success() {
        assert_eq!(classify(&[]), StatusCode::Success);
        assert_eq!(classify(&["running on   16 total cores", "DAV:   1  -0.1E+02"]), StatusCode::Success);
    }

    #[test]
    fn error_beats_warning_in_either_order() {
        assert_eq!(classify(&["WARNING: x", "ERROR: y"]), StatusCode::Error);
        assert_eq!(classify(&["ERROR: y", "WARNING: x"]), StatusCode::Error);
        assert_eq!(classify(&["Warning: sub-space matrix"]), StatusCode::Warning);
    }

    #[test]
    fn nbands_stops_the_scan() {
        assert_eq!(classify(&["ERROR: y", "NBANDS changed"]), StatusCode::NbandsMismatch);
        assert_eq!(classify(&["WARNING", "number of nbands", "ERROR"]), StatusCode::NbandsMismatch);
    }

    #[test]
    fn nbands_checked_first_within_a_line() {
        assert_eq!(classify(&["ERROR: your NBANDS is too small"]), StatusCode::NbandsMismatch);
    }

    #[test]
    fn patterns_are_configurable() {
        let classifier = LogClassifier::new(&LogPatterns {
            error: vec!["Segmentation Fault".into()],
            warning: vec![],
            nbands: vec![],
        });
        assert_eq!(classifier.classify(&["WARNING", "NBANDS"]), StatusCode::Success);
        assert_eq!(classifier.classify(&["segmentation fault (core dumped)"]), StatusCode::Error);
    }

    #[test]
    fn display_names() {
        assert_eq!(StatusCode::NbandsMismatch.to_string(), "NBANDS-MISMATCH");
        assert_eq!(StatusCode::Success.to_string(), "SUCCESS");
    }
}
