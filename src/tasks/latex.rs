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

//! CSV to LaTeX `tabular`.

use crate::FailResult;
use itertools::Itertools;
use regex::Regex;
use std::str::FromStr;

/// How the items of one column are typeset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellFormat {
    /// Copied as is.
    Plain,
    /// A chemical formula: `Al3.92Pt0.08` becomes `$\mathrm{Al}_{3.92}\mathrm{Pt}_{0.08}$`.
    Formula,
    /// Math, with `-N` read as an overbar: `Fm-3m` becomes `$Fm\bar{3}m$`.
    Equation,
}

impl FromStr for CellFormat {
    type Err = failure::Error;

    fn from_str(s: &str) -> FailResult<Self> {
        match s {
            "plain" | "" => Ok(CellFormat::Plain),
            "formula" => Ok(CellFormat::Formula),
            "equation" => Ok(CellFormat::Equation),
            _ => bail!("unknown cell format {:?} (expected plain, formula or equation)", s),
        }
    }
}

lazy_static! {
    static ref RE_ELEMENT: Regex = Regex::new(r"([A-Z][a-z]*)([0-9]*\.?[0-9]*)").unwrap();
    static ref RE_BAR: Regex = Regex::new(r"-([0-9])").unwrap();
}

pub fn format_item(item: &str, format: CellFormat) -> String {
    match format {
        CellFormat::Plain => item.to_string(),
        CellFormat::Formula => {
            let body: String = {
                RE_ELEMENT.captures_iter(item)
                    .map(|caps| match &caps[2] {
                        "" => format!(r"\mathrm{{{}}}", &caps[1]),
                        count => format!(r"\mathrm{{{}}}_{{{}}}", &caps[1], count),
                    })
                    .collect()
            };
            format!("${}$", body)
        },
        CellFormat::Equation => format!("${}$", RE_BAR.replace_all(item, r"\bar{$1}")),
    }
}

/// Renders CSV lines as a `tabular`, with the first line as the header.
///
/// Column count comes from the header. Blank lines are skipped.
pub fn create_latex_table<S: AsRef<str>>(lines: &[S]) -> FailResult<String>
{ create_formatted_latex_table(lines, &[]) }

/// Like `create_latex_table`, applying `formats[i]` to the body items of column `i`.
///
/// Columns without a format are plain. The header is never formatted.
pub fn create_formatted_latex_table<S: AsRef<str>>(lines: &[S], formats: &[CellFormat]) -> FailResult<String> {
    let rows: Vec<&str> = {
        lines.iter()
            .map(|line| line.as_ref().trim())
            .filter(|line| !line.is_empty())
            .collect()
    };
    let (header, body) = match rows.split_first() {
        Some(split) => split,
        None => bail!("cannot make a table from an empty CSV file"),
    };

    let num_columns = header.matches(',').count() + 1;
    if formats.len() > num_columns {
        warn!("{} formats given for a table of {} columns", formats.len(), num_columns);
    }
    let column_spec = (0..num_columns).map(|_| "l").join(" ");

    let mut out = vec![];
    out.push(format!(r"\begin{{tabular}}{{{}}} \\ \hline \hline", column_spec));
    out.push(format!(r"{} \\ \hline", header.split(',').join(" & ")));
    for row in body {
        let items = {
            row.split(',').enumerate()
                .map(|(i, item)| {
                    let format = formats.get(i).cloned().unwrap_or(CellFormat::Plain);
                    format_item(item, format)
                })
                .join(" & ")
        };
        out.push(format!(r"{} \\", items));
    }
    if let Some(last) = out.last_mut() {
        last.push_str(r" \hline \hline");
    }
    out.push(r"\end{tabular}".to_string());
    Ok(out.join("\n"))
}
