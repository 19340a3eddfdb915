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
use std::str::FromStr;

pub(crate) trait ArgMatchesExt {
    // For when the value ought to exist because it was 'required(true)'
    // (and therefore clap would have exited if it were missing)
    fn expect_value_of(&self, s: &str) -> String;

    fn expect_values_of(&self, s: &str) -> Vec<String>;

    /// Parse an optional value, naming the argument in the error.
    fn parse_value_of<T>(&self, s: &str) -> FailResult<Option<T>>
    where T: FromStr, T::Err: std::fmt::Display;
}

impl<'a> ArgMatchesExt for clap::ArgMatches<'a> {
    fn expect_value_of(&self, s: &str) -> String
    { self.value_of(s).unwrap_or_else(|| panic!("BUG! ({} was required)", s)).into() }

    fn expect_values_of(&self, s: &str) -> Vec<String>
    { self.values_of(s).unwrap_or_else(|| panic!("BUG! ({} was required)", s)).map(Into::into).collect() }

    fn parse_value_of<T>(&self, s: &str) -> FailResult<Option<T>>
    where T: FromStr, T::Err: std::fmt::Display,
    {
        match self.value_of(s) {
            None => Ok(None),
            Some(text) => match text.parse() {
                Ok(value) => Ok(Some(value)),
                Err(e) => bail!("invalid value for --{}: {:?} ({})", s.replace('_', "-"), text, e),
            },
        }
    }
}
