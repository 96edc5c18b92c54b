//! SWASH command file parsing.
//!
//! Only the commands that describe grids and output locations are
//! interpreted; every other command is kept as an opaque [`Command`] so the
//! file can be rewritten with unrelated lines untouched.
//!
//! # Syntax handled
//!
//! ```text
//! $ comment to end of line        ! also a comment
//! CGRID REGULAR 0. 0. 0. 4000. 2000. 400 200
//! INPGRID BOTTOM REGULAR 0. 0. 0. 400 200 10. 10. EXC -99.
//! READINP BOTTOM 1. 'bottom.txt' 3 0 FREE
//! POINTS 'gauges' 100. 200. &
//!        300. 400.
//! ```
//!
//! Keywords are case-insensitive and may be abbreviated down to their SWASH
//! minimum (`INP`, `BOT`, `REG`, `READ`, `EXC`). Positional values written as
//! `key=value` are accepted.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bathymetry::GridGeometry;

/// Error parsing a SWASH command file.
#[derive(Debug, Error)]
pub enum SwashParseError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Structurally malformed command.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Token that should be a number.
    #[error("line {line}: invalid {field} '{token}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        token: String,
    },

    /// Grid feature this crate does not convert.
    #[error("line {line}: unsupported {what}")]
    Unsupported { line: usize, what: String },

    /// No stationary, regular BOTTOM input grid with a READINP.
    #[error("no regular BOTTOM input grid with a matching READINP command")]
    MissingBottom,
}

/// One lexical token of a command.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Word(String),
    /// Text between single quotes.
    Quoted(String),
}

impl Token {
    pub fn text(&self) -> &str {
        match self {
            Token::Word(s) | Token::Quoted(s) => s,
        }
    }

    fn is_keyword(&self, full: &str, min_len: usize) -> bool {
        matches!(self, Token::Word(w) if keyword_matches(w, full, min_len))
    }
}

/// True when `word` is `full` abbreviated to at least `min_len` characters.
pub fn keyword_matches(word: &str, full: &str, min_len: usize) -> bool {
    let upper = word.to_ascii_uppercase();
    upper.len() >= min_len && upper.len() <= full.len() && full.starts_with(&upper)
}

/// A logical command, possibly spanning several physical lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// First word, upper-cased.
    pub keyword: String,
    pub args: Vec<Token>,
    /// 0-based index of the first physical line.
    pub first_line: usize,
    /// 0-based index of the last physical line (continuations included).
    pub last_line: usize,
}

impl Command {
    pub fn is(&self, full: &str, min_len: usize) -> bool {
        keyword_matches(&self.keyword, full, min_len)
    }

    /// 1-based line number for messages.
    pub fn line_number(&self) -> usize {
        self.first_line + 1
    }
}

/// SWASH input quantities that can be given on a structured grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    Bottom,
    WaterLevel,
    Current,
    Vx,
    Vy,
    Friction,
    Porosity,
    StoneSize,
    StructureHeight,
    Plants,
    Other(String),
}

impl Quantity {
    const TABLE: [(Quantity, &'static str, usize); 10] = [
        (Quantity::Bottom, "BOTTOM", 3),
        (Quantity::WaterLevel, "WLEVEL", 4),
        (Quantity::Current, "CURRENT", 3),
        (Quantity::Vx, "VX", 2),
        (Quantity::Vy, "VY", 2),
        (Quantity::Friction, "FRICTION", 2),
        (Quantity::Porosity, "POROSITY", 4),
        (Quantity::StoneSize, "PSIZE", 4),
        (Quantity::StructureHeight, "HSTRUCTURE", 4),
        (Quantity::Plants, "NPLANTS", 4),
    ];

    fn from_keyword(word: &str) -> Option<Quantity> {
        Self::TABLE
            .iter()
            .find(|(_, full, min)| keyword_matches(word, full, *min))
            .map(|(q, _, _)| q.clone())
    }

    /// Canonical SWASH keyword.
    pub fn keyword(&self) -> &str {
        match self {
            Quantity::Other(name) => name.as_str(),
            known => Self::TABLE
                .iter()
                .find(|(q, _, _)| q == known)
                .map(|(_, full, _)| *full)
                .unwrap_or("BOTTOM"),
        }
    }

    /// Extension of the node-aligned value file written for this quantity.
    pub fn file_extension(&self) -> String {
        match self {
            Quantity::Bottom => "bot".to_string(),
            Quantity::WaterLevel => "wlev".to_string(),
            Quantity::Current => "cur".to_string(),
            Quantity::Vx => "vx".to_string(),
            Quantity::Vy => "vy".to_string(),
            Quantity::Friction => "fric".to_string(),
            Quantity::Porosity => "poro".to_string(),
            Quantity::StoneSize => "psize".to_string(),
            Quantity::StructureHeight => "hstr".to_string(),
            Quantity::Plants => "npla".to_string(),
            Quantity::Other(name) => name.to_ascii_lowercase(),
        }
    }

    /// Quantities stored as two components per sample.
    pub fn is_vector(&self) -> bool {
        matches!(self, Quantity::Current)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Grid type named in a `CGRID` or `INPGRID` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridKind {
    Regular,
    Curvilinear,
    Unstructured,
}

impl GridKind {
    fn from_token(token: &Token) -> Option<GridKind> {
        if token.is_keyword("REGULAR", 3) {
            Some(GridKind::Regular)
        } else if token.is_keyword("CURVILINEAR", 4) {
            Some(GridKind::Curvilinear)
        } else if token.is_keyword("UNSTRUCTURED", 7) {
            Some(GridKind::Unstructured)
        } else {
            None
        }
    }
}

/// `CGRID REGULAR xpc ypc alpc xlenc ylenc mxc myc`.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputationalGrid {
    pub xpc: f64,
    pub ypc: f64,
    pub alpc: f64,
    pub xlenc: f64,
    pub ylenc: f64,
    pub mxc: usize,
    pub myc: usize,
    /// Index into [`SwashInput::commands`].
    pub command: usize,
}

/// A structured `INPGRID` paired with the `READINP` that fills it.
#[derive(Clone, Debug, PartialEq)]
pub struct InputGrid {
    pub quantity: Quantity,
    pub geometry: GridGeometry,
    /// Grid rotation in degrees.
    pub alp: f64,
    pub exception: Option<f64>,
    pub nonstationary: bool,
    /// Multiplication factor applied to file values.
    pub fac: f64,
    /// File name as written in the command file.
    pub file: String,
    /// SWASH layout code of the value file.
    pub idla: i32,
    /// Header lines to skip.
    pub nhedf: usize,
    /// Data format keyword when not FREE.
    pub format: Option<String>,
    /// Index of the `INPGRID` command.
    pub inpgrid_command: usize,
    /// Index of the `READINP` command.
    pub readinp_command: usize,
}

impl InputGrid {
    /// Whether this grid can be carried onto an unstructured mesh.
    pub fn convertible(&self) -> Result<(), String> {
        if self.nonstationary {
            return Err("non-stationary input grid".to_string());
        }
        if self.quantity.is_vector() {
            return Err("vector input quantity".to_string());
        }
        Ok(())
    }
}

/// Where the coordinates of a `POINTS` set come from.
#[derive(Clone, Debug, PartialEq)]
pub enum PointSource {
    Inline(Vec<(f64, f64)>),
    File(String),
}

/// `POINTS 'sname' ...` output location set.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    pub name: String,
    pub source: PointSource,
}

#[derive(Clone, Debug)]
struct InpGridCommand {
    quantity: Quantity,
    kind: GridKind,
    numbers: Vec<f64>,
    exception: Option<f64>,
    nonstationary: bool,
    command: usize,
}

/// A parsed SWASH command file.
#[derive(Clone, Debug)]
pub struct SwashInput {
    path: Option<PathBuf>,
    lines: Vec<String>,
    commands: Vec<Command>,
}

impl SwashInput {
    /// Read and tokenize a command file.
    pub fn read(path: &Path) -> Result<Self, SwashParseError> {
        let source = fs::read_to_string(path)?;
        let mut input = Self::parse(&source)?;
        input.path = Some(path.to_path_buf());
        Ok(input)
    }

    /// Tokenize command file text.
    pub fn parse(source: &str) -> Result<Self, SwashParseError> {
        let lines: Vec<String> = source.split_inclusive('\n').map(str::to_string).collect();
        let commands = tokenize(&lines)?;
        Ok(Self {
            path: None,
            lines,
            commands,
        })
    }

    /// Path the file was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory that relative file names in the commands resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Physical lines including their terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The regular computational grid, if the file defines one.
    pub fn computational_grid(&self) -> Result<Option<ComputationalGrid>, SwashParseError> {
        for (index, cmd) in self.commands.iter().enumerate() {
            if !cmd.is("CGRID", 3) {
                continue;
            }
            let mut args = cmd.args.as_slice();
            match args.first().and_then(GridKind::from_token) {
                Some(GridKind::Regular) => args = &args[1..],
                Some(_) => return Ok(None),
                None => {}
            }
            let numbers = numbers(cmd, args, "CGRID value")?;
            if numbers.len() < 7 {
                return Err(SwashParseError::Syntax {
                    line: cmd.line_number(),
                    message: format!("CGRID REGULAR needs 7 values, found {}", numbers.len()),
                });
            }
            return Ok(Some(ComputationalGrid {
                xpc: numbers[0],
                ypc: numbers[1],
                alpc: numbers[2],
                xlenc: numbers[3],
                ylenc: numbers[4],
                mxc: count(cmd, numbers[5], "mxc")?,
                myc: count(cmd, numbers[6], "myc")?,
                command: index,
            }));
        }
        Ok(None)
    }

    /// Every regular `INPGRID` that has a matching `READINP`, in file order.
    ///
    /// A `READINP` fills the most recent `INPGRID` of the same quantity.
    pub fn input_grids(&self) -> Result<Vec<InputGrid>, SwashParseError> {
        let mut pending: Vec<InpGridCommand> = Vec::new();
        let mut grids = Vec::new();

        for (index, cmd) in self.commands.iter().enumerate() {
            if cmd.is("INPGRID", 3) {
                pending.retain(|p| p.quantity != self.inpgrid_quantity(cmd));
                pending.push(self.parse_inpgrid(cmd, index)?);
            } else if cmd.is("READINP", 4) {
                let mut args = cmd.args.as_slice();
                let quantity = match args.first().and_then(|t| match t {
                    Token::Word(w) => Quantity::from_keyword(w),
                    Token::Quoted(_) => None,
                }) {
                    Some(q) => {
                        args = &args[1..];
                        q
                    }
                    None => Quantity::Bottom,
                };

                let Some(pos) = pending.iter().rposition(|p| p.quantity == quantity) else {
                    tracing::warn!(
                        line = cmd.line_number(),
                        quantity = %quantity,
                        "READINP without a preceding INPGRID, ignored"
                    );
                    continue;
                };
                let inpgrid = pending.remove(pos);
                if inpgrid.kind != GridKind::Regular {
                    continue;
                }
                grids.push(self.pair(cmd, index, args, inpgrid)?);
            }
        }

        Ok(grids)
    }

    /// The structured BOTTOM grid; required for mesh creation.
    pub fn bottom_grid(&self) -> Result<InputGrid, SwashParseError> {
        self.input_grids()?
            .into_iter()
            .find(|g| g.quantity == Quantity::Bottom)
            .ok_or(SwashParseError::MissingBottom)
    }

    /// All `POINTS` output location sets.
    pub fn point_sets(&self) -> Result<Vec<PointSet>, SwashParseError> {
        let mut sets = Vec::new();
        for cmd in self.commands.iter().filter(|c| c.is("POINTS", 4)) {
            let Some(Token::Quoted(name)) = cmd.args.first() else {
                return Err(SwashParseError::Syntax {
                    line: cmd.line_number(),
                    message: "POINTS needs a quoted set name".to_string(),
                });
            };
            let rest = &cmd.args[1..];
            let source = if rest.first().is_some_and(|t| t.is_keyword("FILE", 4)) {
                match rest.get(1) {
                    Some(token) => PointSource::File(token.text().to_string()),
                    None => {
                        return Err(SwashParseError::Syntax {
                            line: cmd.line_number(),
                            message: "POINTS FILE needs a file name".to_string(),
                        })
                    }
                }
            } else {
                let values = numbers(cmd, rest, "point coordinate")?;
                if values.len() % 2 != 0 {
                    return Err(SwashParseError::Syntax {
                        line: cmd.line_number(),
                        message: "POINTS needs x y pairs".to_string(),
                    });
                }
                PointSource::Inline(values.chunks(2).map(|c| (c[0], c[1])).collect())
            };
            sets.push(PointSet {
                name: name.clone(),
                source,
            });
        }
        Ok(sets)
    }

    fn inpgrid_quantity(&self, cmd: &Command) -> Quantity {
        match cmd.args.first() {
            Some(Token::Word(w)) => Quantity::from_keyword(w).unwrap_or(Quantity::Bottom),
            _ => Quantity::Bottom,
        }
    }

    fn parse_inpgrid(&self, cmd: &Command, index: usize) -> Result<InpGridCommand, SwashParseError> {
        let mut args = cmd.args.as_slice();
        let quantity = self.inpgrid_quantity(cmd);
        if args
            .first()
            .is_some_and(|t| matches!(t, Token::Word(w) if Quantity::from_keyword(w).is_some()))
        {
            args = &args[1..];
        }

        let mut kind = GridKind::Regular;
        if let Some(k) = args.first().and_then(GridKind::from_token) {
            kind = k;
            args = &args[1..];
        }

        let mut values = Vec::new();
        let mut exception = None;
        let mut nonstationary = false;
        let mut i = 0;
        while i < args.len() {
            let token = &args[i];
            if token.is_keyword("EXCEPTION", 3) {
                let value = args.get(i + 1).ok_or_else(|| SwashParseError::Syntax {
                    line: cmd.line_number(),
                    message: "EXCEPTION needs a value".to_string(),
                })?;
                exception = Some(number(cmd, value, "exception value")?);
                i += 2;
                continue;
            }
            if token.is_keyword("NONSTATIONARY", 7) {
                nonstationary = true;
                break;
            }
            if kind == GridKind::Regular {
                values.push(number(cmd, token, "INPGRID value")?);
            }
            i += 1;
        }

        if kind == GridKind::Regular && values.len() < 7 {
            return Err(SwashParseError::Syntax {
                line: cmd.line_number(),
                message: format!(
                    "INPGRID {} REGULAR needs 7 values, found {}",
                    quantity,
                    values.len()
                ),
            });
        }

        Ok(InpGridCommand {
            quantity,
            kind,
            numbers: values,
            exception,
            nonstationary,
            command: index,
        })
    }

    fn pair(
        &self,
        cmd: &Command,
        index: usize,
        args: &[Token],
        inpgrid: InpGridCommand,
    ) -> Result<InputGrid, SwashParseError> {
        let fac = match args.first() {
            Some(t) => number(cmd, t, "fac")?,
            None => {
                return Err(SwashParseError::Syntax {
                    line: cmd.line_number(),
                    message: "READINP needs fac and a file name".to_string(),
                })
            }
        };
        let file = match args.get(1) {
            Some(t) if t.is_keyword("SERIES", 4) => {
                return Err(SwashParseError::Unsupported {
                    line: cmd.line_number(),
                    what: "READINP SERIES".to_string(),
                })
            }
            Some(t) => t.text().to_string(),
            None => {
                return Err(SwashParseError::Syntax {
                    line: cmd.line_number(),
                    message: "READINP needs a file name".to_string(),
                })
            }
        };

        let mut idla = 1;
        let mut nhedf = 0;
        let mut format = None;
        let mut positional = 0;
        let mut rest = args[2..].iter();
        while let Some(token) = rest.next() {
            if token.is_keyword("FREE", 4) {
                continue;
            }
            if token.is_keyword("FORMAT", 3) {
                let spec = rest.next().map(|t| t.text().to_string()).unwrap_or_default();
                format = Some(format!("FORMAT {spec}"));
                continue;
            }
            if token.is_keyword("UNFORMATTED", 3) {
                format = Some("UNFORMATTED".to_string());
                continue;
            }
            match positional {
                0 => idla = count(cmd, number(cmd, token, "idla")?, "idla")? as i32,
                1 => nhedf = count(cmd, number(cmd, token, "nhedf")?, "nhedf")?,
                // nhedt, nhedvec and numeric format codes
                _ => {
                    if positional == 4 {
                        format = Some(format!("format code {}", token.text()));
                    }
                }
            }
            positional += 1;
        }

        let n = &inpgrid.numbers;
        let inp_cmd = &self.commands[inpgrid.command];
        let geometry = GridGeometry::from_swash(
            n[0],
            n[1],
            count(inp_cmd, n[3], "mx")?,
            count(inp_cmd, n[4], "my")?,
            n[5],
            n[6],
        );

        Ok(InputGrid {
            quantity: inpgrid.quantity,
            geometry,
            alp: n[2],
            exception: inpgrid.exception,
            nonstationary: inpgrid.nonstationary,
            fac,
            file,
            idla,
            nhedf,
            format,
            inpgrid_command: inpgrid.command,
            readinp_command: index,
        })
    }
}

fn number(cmd: &Command, token: &Token, field: &'static str) -> Result<f64, SwashParseError> {
    parse_number(token.text()).ok_or_else(|| SwashParseError::InvalidNumber {
        line: cmd.line_number(),
        field,
        token: token.text().to_string(),
    })
}

fn numbers(cmd: &Command, tokens: &[Token], field: &'static str) -> Result<Vec<f64>, SwashParseError> {
    tokens.iter().map(|t| number(cmd, t, field)).collect()
}

/// Largest mesh count accepted per direction.
const MAX_MESHES: f64 = 1.0e7;

fn count(cmd: &Command, value: f64, field: &'static str) -> Result<usize, SwashParseError> {
    if (0.0..=MAX_MESHES).contains(&value) && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(SwashParseError::InvalidNumber {
            line: cmd.line_number(),
            field,
            token: value.to_string(),
        })
    }
}

/// Parse a SWASH number; Fortran `D` exponents are accepted.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .or_else(|| text.replace(['d', 'D'], "e").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Split the physical lines into logical commands.
fn tokenize(lines: &[String]) -> Result<Vec<Command>, SwashParseError> {
    let mut commands = Vec::new();
    let mut current: Option<(Vec<Token>, usize)> = None;

    for (line_idx, line) in lines.iter().enumerate() {
        let (mut tokens, unterminated) = tokenize_line(line);
        if unterminated {
            return Err(SwashParseError::Syntax {
                line: line_idx + 1,
                message: "unterminated quoted string".to_string(),
            });
        }

        let continues = matches!(tokens.last(), Some(Token::Word(w)) if w == "&" || w == "_");
        if continues {
            tokens.pop();
        }

        let (mut acc, first) = current.take().unwrap_or_else(|| (Vec::new(), line_idx));
        acc.extend(tokens);

        if continues {
            current = Some((acc, first));
            continue;
        }
        if acc.is_empty() {
            continue;
        }

        let mut iter = acc.into_iter();
        let keyword = match iter.next() {
            Some(Token::Word(w)) => w.to_ascii_uppercase(),
            Some(Token::Quoted(q)) => {
                return Err(SwashParseError::Syntax {
                    line: first + 1,
                    message: format!("command starts with quoted text '{q}'"),
                })
            }
            None => continue,
        };
        commands.push(Command {
            keyword,
            args: iter.collect(),
            first_line: first,
            last_line: line_idx,
        });
    }

    if let Some((acc, first)) = current {
        if let Some(Token::Word(w)) = acc.first() {
            commands.push(Command {
                keyword: w.to_ascii_uppercase(),
                args: acc[1..].to_vec(),
                first_line: first,
                last_line: lines.len().saturating_sub(1),
            });
        }
    }

    Ok(commands)
}

/// Tokens of one physical line and whether a quote was left open.
fn tokenize_line(line: &str) -> (Vec<Token>, bool) {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = line.chars();
    let mut in_comment = false;

    fn flush(word: &mut String, tokens: &mut Vec<Token>) {
        if word.is_empty() {
            return;
        }
        // key=value keeps only the value
        let text = match word.split_once('=') {
            Some((_, value)) => value.to_string(),
            None => word.clone(),
        };
        if !text.is_empty() {
            tokens.push(Token::Word(text));
        }
        word.clear();
    }

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '$' {
                in_comment = false;
            }
            continue;
        }
        match c {
            '$' => {
                flush(&mut word, &mut tokens);
                in_comment = true;
            }
            '!' => {
                flush(&mut word, &mut tokens);
                break;
            }
            '\'' | '"' => {
                flush(&mut word, &mut tokens);
                let mut quoted = String::new();
                let mut closed = false;
                for q in chars.by_ref() {
                    if q == c {
                        closed = true;
                        break;
                    }
                    quoted.push(q);
                }
                if !closed {
                    return (tokens, true);
                }
                tokens.push(Token::Quoted(quoted));
            }
            c if c.is_whitespace() || c == ',' => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    (tokens, false)
}
