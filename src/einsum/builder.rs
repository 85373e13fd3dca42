//! Builder pattern for einsum construction.

use std::collections::HashMap;

use super::{Einsum, EinsumSpec};
use crate::error::{Error, Result};

/// Builder for einsum specifications from label slices.
///
/// # Example
///
/// ```rust
/// use einsum_core::EinBuilder;
///
/// let spec = EinBuilder::new()
///     .input(&['i', 'j'])   // A[i,j]
///     .input(&['j', 'k'])   // B[j,k]
///     .output(&['i', 'k'])  // C[i,k]
///     .build()
///     .unwrap();
/// assert_eq!(spec.to_string(), "ij,jk->ik");
///
/// // With extents the builder can also produce a plan
/// let plan = EinBuilder::new()
///     .input(&['i', 'j'])
///     .output(&['j'])
///     .size('i', 10)
///     .size('j', 20)
///     .plan()
///     .unwrap();
/// assert_eq!(plan.output_shape(), vec![20]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EinBuilder {
    ixs: Vec<Vec<char>>,
    iy: Option<Vec<char>>,
    size_dict: HashMap<char, usize>,
}

impl EinBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input tensor specification.
    pub fn input(mut self, labels: &[char]) -> Self {
        self.ixs.push(labels.to_vec());
        self
    }

    /// Set the output specification.
    pub fn output(mut self, labels: &[char]) -> Self {
        self.iy = Some(labels.to_vec());
        self
    }

    /// Set the extent of a label.
    pub fn size(mut self, label: char, size: usize) -> Self {
        self.size_dict.insert(label, size);
        self
    }

    /// Set multiple extents at once.
    pub fn sizes(mut self, sizes: impl IntoIterator<Item = (char, usize)>) -> Self {
        self.size_dict.extend(sizes);
        self
    }

    /// Build the specification. Extents are not consulted.
    pub fn build(self) -> Result<EinsumSpec> {
        Self::spec(self.ixs, self.iy)
    }

    /// Build a plan from the recorded extents.
    pub fn plan(self) -> Result<Einsum> {
        let spec = Self::spec(self.ixs, self.iy)?;
        Einsum::from_sizes(spec, self.size_dict)
    }

    fn spec(ixs: Vec<Vec<char>>, iy: Option<Vec<char>>) -> Result<EinsumSpec> {
        match iy {
            Some(iy) => EinsumSpec::new(ixs, iy),
            None => {
                let lhs: Vec<String> = ixs.iter().map(|g| g.iter().collect()).collect();
                Err(Error::syntax(&lhs.join(","), "output labels not specified"))
            }
        }
    }
}

/// Convenience macro for einsum specifications from label lists.
///
/// Without extents it yields `Result<EinsumSpec>`; with `; label => size`
/// pairs it yields `Result<Einsum>`.
///
/// # Example
///
/// ```rust
/// use einsum_core::ein;
///
/// // A[i,j] × B[j,k] → C[i,k]
/// let spec = ein!(['i', 'j'], ['j', 'k'] -> ['i', 'k']).unwrap();
/// assert_eq!(spec.to_string(), "ij,jk->ik");
///
/// let plan = ein!(['i', 'j'], ['j', 'k'] -> ['i', 'k']; 'i' => 2, 'j' => 3, 'k' => 4).unwrap();
/// assert_eq!(plan.index_space(), 24);
/// ```
#[macro_export]
macro_rules! ein {
    ($([$($ix:expr),*]),+ -> [$($iy:expr),*]) => {{
        let mut builder = $crate::EinBuilder::new();
        $(
            builder = builder.input(&[$($ix),*]);
        )+
        builder.output(&[$($iy),*]).build()
    }};
    ($([$($ix:expr),*]),+ -> [$($iy:expr),*]; $($label:expr => $size:expr),*) => {{
        let mut builder = $crate::EinBuilder::new();
        $(
            builder = builder.input(&[$($ix),*]);
        )+
        builder = builder.output(&[$($iy),*]);
        $(
            builder = builder.size($label, $size);
        )*
        builder.plan()
    }};
}
