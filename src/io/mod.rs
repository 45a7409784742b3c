use std::{
    fmt::Write as _,
    io::{BufRead, BufReader, BufWriter, Read, Write},
};

use crate::{
    error::{Error, Result},
    types::{to_var, Formula, Lit},
};

/// Renders `formula` as DIMACS text: one `c` line per comment, the
/// `p cnf` header, then one `0`-terminated line per clause.
pub fn encode(formula: &Formula, comments: &[String]) -> String {
    let mut text = String::new();
    for comment in comments {
        // writing into a String cannot fail
        let _ = writeln!(text, "c {comment}");
    }
    let _ = writeln!(
        text,
        "p cnf {} {}",
        formula.var_count,
        formula.clauses.len()
    );
    for clause in &formula.clauses {
        for lit in clause {
            let _ = write!(text, "{lit} ");
        }
        text.push_str("0\n");
    }
    text
}

pub fn write_formula(
    writer: &mut impl Write,
    formula: &Formula,
    comments: &[String],
) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    writer.write_all(encode(formula, comments).as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}

fn parse_header(line_no: usize, line: &str) -> Result<(usize, usize)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[..] {
        ["p", "cnf", vars, clauses] => {
            let vars = vars
                .parse::<usize>()
                .map_err(|_| parse_error(line_no, format!("bad variable count `{vars}`")))?;
            let clauses = clauses
                .parse::<usize>()
                .map_err(|_| parse_error(line_no, format!("bad clause count `{clauses}`")))?;
            Ok((vars, clauses))
        }
        _ => Err(parse_error(line_no, format!("expected `p cnf V C`, got `{line}`"))),
    }
}

pub fn read_formula(reader: &mut impl Read) -> Result<Formula> {
    let mut lines = BufReader::new(reader).lines().enumerate();

    let (var_count, clause_count) = loop {
        let Some((i, line)) = lines.next() else {
            return Err(parse_error(0, "missing problem line"));
        };
        let line = line?;

        if line.starts_with('c') || line.trim().is_empty() {
            // comment line
            continue;
        }

        break parse_header(i + 1, &line)?;
    };

    let mut clauses = vec![];
    let mut clause = vec![];
    let mut last_line = 0;

    for (i, line) in lines {
        let line = line?;
        last_line = i + 1;

        // some benchmark suites end with a `%` trailer
        if line.starts_with('%') {
            break;
        }
        if line.starts_with('c') {
            continue;
        }

        for word in line.split_whitespace() {
            let lit = word
                .parse::<Lit>()
                .map_err(|_| parse_error(last_line, format!("bad literal `{word}`")))?;
            match lit {
                0 => {
                    clauses.push(std::mem::take(&mut clause));
                }
                _ if to_var(lit) > var_count => {
                    return Err(parse_error(
                        last_line,
                        format!("literal {lit} exceeds declared variable count {var_count}"),
                    ));
                }
                _ => {
                    clause.push(lit);
                }
            }
        }
    }

    if !clause.is_empty() {
        return Err(parse_error(last_line, "last clause is not terminated by 0"));
    }
    if clause_count != clauses.len() {
        return Err(parse_error(
            last_line,
            format!(
                "header declares {clause_count} clauses, found {}",
                clauses.len()
            ),
        ));
    }

    Ok(Formula { var_count, clauses })
}
