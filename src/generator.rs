use rand::{seq::index, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{
    error::{Error, Result},
    io,
    types::{Clause, Formula, Lit},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorParams {
    pub var_count: usize,
    pub clause_count: usize,
    pub min_clause_len: usize,
    pub max_clause_len: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            var_count: 50,
            clause_count: 200,
            min_clause_len: 2,
            max_clause_len: 4,
            seed: None,
        }
    }
}

impl GeneratorParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_clause_len < 1 {
            return Err(Error::InvalidParameters(format!(
                "minimum clause length must be at least 1, got {}",
                self.min_clause_len
            )));
        }
        if self.max_clause_len < self.min_clause_len {
            return Err(Error::InvalidParameters(format!(
                "maximum clause length {} is below minimum clause length {}",
                self.max_clause_len, self.min_clause_len
            )));
        }
        if Lit::try_from(self.var_count).is_err() {
            return Err(Error::InvalidParameters(format!(
                "variable count {} does not fit a literal",
                self.var_count
            )));
        }
        Ok(())
    }
}

/// Draws a random CNF formula.
///
/// Every clause gets a length uniform in `min_clause_len..=max_clause_len`,
/// clamped to `var_count`, and distinct variables with independent random
/// polarity. Equal parameters with an explicit seed give equal formulas.
///
/// With `var_count == 0` and `clause_count > 0` every clause is empty, so
/// the result is unsatisfiable.
pub fn generate(params: &GeneratorParams) -> Result<Formula> {
    params.validate()?;

    let seed = params.seed.unwrap_or_else(rand::random);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    log::debug!("generate; params: {:?}; effective seed: {}", params, seed);

    if params.var_count == 0 && params.clause_count > 0 {
        log::warn!(
            "generating {} clauses over zero variables; every clause is empty and the formula is unsatisfiable",
            params.clause_count
        );
    }

    let clauses = (0..params.clause_count)
        .map(|_| random_clause(&mut rng, params))
        .collect();

    Ok(Formula {
        var_count: params.var_count,
        clauses,
    })
}

fn random_clause(rng: &mut impl Rng, params: &GeneratorParams) -> Clause {
    let len = rng
        .gen_range(params.min_clause_len..=params.max_clause_len)
        .min(params.var_count);
    if len == 0 {
        return vec![];
    }

    index::sample(rng, params.var_count, len)
        .into_iter()
        .map(|i| {
            // validated to fit, see `GeneratorParams::validate`
            let lit = (i + 1) as Lit;
            if rng.gen_bool(0.5) {
                lit
            } else {
                -lit
            }
        })
        .collect()
}

pub fn default_comments(params: &GeneratorParams) -> Vec<String> {
    vec![
        format!("Random {}-SAT", params.max_clause_len),
        format!("vars={} clauses={}", params.var_count, params.clause_count),
    ]
}

/// Generates a formula and renders it as DIMACS text with the default
/// comment lines.
pub fn formula_string(params: &GeneratorParams) -> Result<String> {
    let formula = generate(params)?;
    Ok(io::encode(&formula, &default_comments(params)))
}
