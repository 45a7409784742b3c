use std::fmt;

pub type Lit = i32;

pub type Var = usize;

pub type Clause = Vec<Lit>;

pub fn to_var(lit: Lit) -> Var {
    lit.unsigned_abs() as Var
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    pub var_count: usize,
    pub clauses: Vec<Clause>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Sat,
    Unsat,
    Timeout,
    Error,
    Unknown,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Sat => "SAT",
            Verdict::Unsat => "UNSAT",
            Verdict::Timeout => "TIMEOUT",
            Verdict::Error => "ERROR",
            Verdict::Unknown => "UNKNOWN",
        }
    }

    /// Whether the verdict records a failure of the solver run itself.
    pub fn is_failure(self) -> bool {
        matches!(self, Verdict::Timeout | Verdict::Error)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so that width specifiers work in report lines
        f.pad(self.as_str())
    }
}
