//! Rewriting a SWASH command file for an unstructured mesh.
//!
//! ```text
//! CGRID REGULAR ...                 ->  CGRID UNSTRUCTURED
//!                                       READGRID UNSTRUCTURED TRIANGLE 'mesh'
//! INPGRID BOTTOM REGULAR ... EXC e  ->  INPGRID BOTTOM UNSTRUCTURED EXCEPTION e
//! READINP BOTTOM fac 'depth.txt' .. ->  READINP BOTTOM 1. 'mesh.bot' 1 0 FREE
//! ```
//!
//! Only the physical lines of the rewritten commands change; every other
//! line, comments and blank lines included, is copied byte-for-byte. A
//! rewritten command keeps the indentation and line terminator of its
//! original.

use std::collections::BTreeMap;

use crate::io::swash_input::{Command, InputGrid, SwashInput, SwashParseError};

/// An input grid to point at a node-aligned value file.
#[derive(Clone, Debug)]
pub struct GridPatch<'a> {
    pub grid: &'a InputGrid,
    /// File name to write into the `READINP` command.
    pub file: String,
}

impl<'a> GridPatch<'a> {
    pub fn new(grid: &'a InputGrid, file: impl Into<String>) -> Self {
        Self {
            grid,
            file: file.into(),
        }
    }
}

/// Text of `input` rewritten for the mesh `mesh_base` and the given grids.
pub fn patch_input(
    input: &SwashInput,
    mesh_base: &str,
    grids: &[GridPatch<'_>],
) -> Result<String, SwashParseError> {
    let commands = input.commands();
    let mut replacements: BTreeMap<usize, (&Command, Vec<String>)> = BTreeMap::new();

    match input.computational_grid()? {
        Some(cgrid) => {
            replacements.insert(
                cgrid.command,
                (
                    &commands[cgrid.command],
                    vec![
                        "CGRID UNSTRUCTURED".to_string(),
                        format!("READGRID UNSTRUCTURED TRIANGLE '{mesh_base}'"),
                    ],
                ),
            );
        }
        None => tracing::warn!("no regular CGRID command, computational grid left unchanged"),
    }

    for patch in grids {
        let grid = patch.grid;
        let quantity = grid.quantity.keyword();
        let inpgrid = match grid.exception {
            Some(exc) => format!("INPGRID {quantity} UNSTRUCTURED EXCEPTION {exc}"),
            None => format!("INPGRID {quantity} UNSTRUCTURED"),
        };
        let readinp = format!("READINP {quantity} 1. '{}' 1 0 FREE", patch.file);
        replacements.insert(grid.inpgrid_command, (&commands[grid.inpgrid_command], vec![inpgrid]));
        replacements.insert(grid.readinp_command, (&commands[grid.readinp_command], vec![readinp]));
    }

    let lines = input.lines();
    let mut out = String::with_capacity(lines.iter().map(String::len).sum::<usize>() + 128);
    let mut spans = replacements.values().peekable();
    let mut line = 0;
    while line < lines.len() {
        if let Some((cmd, new_lines)) = spans.next_if(|(cmd, _)| cmd.first_line == line) {
            let indent = leading_whitespace(&lines[cmd.first_line]);
            let terminator = line_terminator(&lines[cmd.last_line]);
            let eol = if terminator.is_empty() { "\n" } else { terminator };
            for (k, text) in new_lines.iter().enumerate() {
                out.push_str(indent);
                out.push_str(text);
                out.push_str(if k + 1 == new_lines.len() { terminator } else { eol });
            }
            line = cmd.last_line + 1;
        } else {
            out.push_str(&lines[line]);
            line += 1;
        }
    }

    Ok(out)
}

fn leading_whitespace(line: &str) -> &str {
    let end = line.len() - line.trim_start().len();
    &line[..end]
}

fn line_terminator(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
