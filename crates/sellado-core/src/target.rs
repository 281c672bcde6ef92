#![forbid(unsafe_code)]

/// Which existing signers of a container receive a new counter-signature.
///
/// `Nodes` and `Signers` carry 0-based indices into the depth-first
/// pre-order numbering of the signer tree, roots first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterSignTarget {
    Tree,
    Leafs,
    Nodes(Vec<usize>),
    Signers(Vec<usize>),
}

impl CounterSignTarget {
    /// A single node by pre-order index.
    pub fn node(index: usize) -> Self {
        Self::Nodes(vec![index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node() {
        assert_eq!(CounterSignTarget::node(3), CounterSignTarget::Nodes(vec![3]));
    }
}
