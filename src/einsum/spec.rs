//! Parsing of einsum specification strings.
//!
//! Grammar:
//!
//! ```text
//! spec   := groups "->" group
//! groups := group ("," group)*
//! group  := symbol*
//! ```
//!
//! A symbol is any single character other than `,`, `-`, `>`, whitespace or a
//! control character. Input groups may repeat symbols (diagonals); the output
//! group may not.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed einsum specification, independent of operand shapes.
///
/// # Example
///
/// ```rust
/// use einsum_core::EinsumSpec;
///
/// let spec: EinsumSpec = "ij,jk->ik".parse().unwrap();
/// assert_eq!(spec.num_inputs(), 2);
/// assert_eq!(spec.output(), &['i', 'k']);
/// assert_eq!(spec.to_string(), "ij,jk->ik");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EinsumSpec {
    inputs: Vec<Vec<char>>,
    output: Vec<char>,
}

impl EinsumSpec {
    /// Parse a specification string.
    pub fn parse(spec: &str) -> Result<Self> {
        let (lhs, rhs) = spec
            .split_once("->")
            .ok_or_else(|| Error::syntax(spec, "missing '->'"))?;

        let mut inputs = Vec::new();
        for group in lhs.split(',') {
            inputs.push(parse_group(spec, group)?);
        }
        let output = parse_group(spec, rhs)?;

        Self::from_groups(spec, inputs, output)
    }

    /// Build from label groups, applying the same symbol rules as [`parse`](Self::parse).
    ///
    /// At least one input group is required; a scalar operand is an empty
    /// group, not a missing one.
    pub fn new(inputs: Vec<Vec<char>>, output: Vec<char>) -> Result<Self> {
        let rendered = render(&inputs, &output);
        if inputs.is_empty() {
            return Err(Error::syntax(&rendered, "at least one input group is required"));
        }
        for &c in inputs.iter().flatten().chain(&output) {
            check_symbol(&rendered, c)?;
        }
        Self::from_groups(&rendered, inputs, output)
    }

    fn from_groups(spec: &str, inputs: Vec<Vec<char>>, output: Vec<char>) -> Result<Self> {
        for (pos, c) in output.iter().enumerate() {
            if output[..pos].contains(c) {
                return Err(Error::syntax(
                    spec,
                    format!("output symbol '{}' appears more than once", c),
                ));
            }
        }
        Ok(Self { inputs, output })
    }

    /// Label groups of the operands, in order.
    pub fn inputs(&self) -> &[Vec<char>] {
        &self.inputs
    }

    /// Output label group.
    pub fn output(&self) -> &[char] {
        &self.output
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Distinct symbols over all inputs, in order of first appearance.
    pub fn labels(&self) -> Vec<char> {
        let mut seen = Vec::new();
        for &c in self.inputs.iter().flatten() {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        seen
    }
}

fn parse_group(spec: &str, group: &str) -> Result<Vec<char>> {
    group
        .chars()
        .map(|c| check_symbol(spec, c).map(|()| c))
        .collect()
}

fn check_symbol(spec: &str, c: char) -> Result<()> {
    match c {
        ',' | '-' | '>' => Err(Error::syntax(
            spec,
            format!("unexpected '{}' inside a label group", c),
        )),
        c if c.is_whitespace() || c.is_control() => Err(Error::syntax(
            spec,
            format!("{:?} is not a valid index symbol", c),
        )),
        _ => Ok(()),
    }
}

fn render(inputs: &[Vec<char>], output: &[char]) -> String {
    let lhs: Vec<String> = inputs.iter().map(|g| g.iter().collect()).collect();
    let rhs: String = output.iter().collect();
    format!("{}->{}", lhs.join(","), rhs)
}

impl FromStr for EinsumSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EinsumSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.inputs, &self.output))
    }
}
