// External imports
use serde::{Deserialize, Serialize};
use std::ops::Range;

// Internal imports
use crate::error::{FusionGruError, Result};

/// Sequence-length descriptor (lod) of a flattened batch
///
/// Rows `0..T` of a `[T, *]` tensor are partitioned into consecutive
/// variable-length sequences. The lengths form is what callers write
/// (`[[2, 4, 3]]`); the offsets form (`[0, 2, 6, 9]`) is what the recurrence
/// walks. Only a single level is supported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct SequenceLod {
    lengths: Vec<usize>,
}

impl SequenceLod {
    /// Build from the nested lengths form, e.g. `[[2, 4, 3]]`
    pub fn new(levels: &[Vec<usize>]) -> Result<Self> {
        match levels {
            [lengths] => Self::from_lengths(lengths),
            [] => Err(FusionGruError::InvalidLod("lod has no levels".into())),
            _ => Err(FusionGruError::InvalidLod(format!(
                "expected a single lod level, got {}",
                levels.len()
            ))),
        }
    }

    /// Build from a single level of sequence lengths
    pub fn from_lengths(lengths: &[usize]) -> Result<Self> {
        if lengths.is_empty() {
            return Err(FusionGruError::InvalidLod("lod has no sequences".into()));
        }
        if let Some(pos) = lengths.iter().position(|&len| len == 0) {
            return Err(FusionGruError::InvalidLod(format!(
                "sequence {} has zero length",
                pos
            )));
        }
        Ok(Self {
            lengths: lengths.to_vec(),
        })
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Cumulative offsets, one more entry than there are sequences
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.lengths.len() + 1);
        offsets.push(0);
        let mut acc = 0;
        for len in &self.lengths {
            acc += len;
            offsets.push(acc);
        }
        offsets
    }

    /// Batch size N
    pub fn num_sequences(&self) -> usize {
        self.lengths.len()
    }

    /// Total row count T
    pub fn total_len(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// Iterate over every sequence's row range in batch order
    pub fn sequence_ranges(&self) -> impl Iterator<Item = Range<usize>> {
        let offsets = self.offsets();
        (0..self.num_sequences()).map(move |i| offsets[i]..offsets[i + 1])
    }

    /// Check that the lod covers exactly `rows` rows of a tensor named `name`
    pub fn validate_rows(&self, name: &str, rows: usize) -> Result<()> {
        let total = self.total_len();
        if total != rows {
            return Err(FusionGruError::InvalidLod(format!(
                "lod covers {} rows but '{}' has {} rows",
                total, name, rows
            )));
        }
        Ok(())
    }

    /// Nested lengths form
    pub fn to_levels(&self) -> Vec<Vec<usize>> {
        vec![self.lengths.clone()]
    }
}

impl TryFrom<Vec<Vec<usize>>> for SequenceLod {
    type Error = FusionGruError;

    fn try_from(levels: Vec<Vec<usize>>) -> Result<Self> {
        Self::new(&levels)
    }
}

impl From<SequenceLod> for Vec<Vec<usize>> {
    fn from(lod: SequenceLod) -> Self {
        lod.to_levels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let lod = SequenceLod::new(&[vec![2, 4, 3]]).unwrap();
        assert_eq!(lod.num_sequences(), 3);
        assert_eq!(lod.total_len(), 9);
        assert_eq!(lod.offsets(), vec![0, 2, 6, 9]);
        let ranges: Vec<_> = lod.sequence_ranges().collect();
        assert_eq!(ranges, vec![0..2, 2..6, 6..9]);
    }

    #[test]
    fn test_sum_of_lengths_matches_rows() {
        let lod = SequenceLod::from_lengths(&[2, 4, 3]).unwrap();
        assert!(lod.validate_rows("X", 9).is_ok());
        assert!(matches!(
            lod.validate_rows("X", 8),
            Err(FusionGruError::InvalidLod(_))
        ));
    }

    #[test]
    fn test_single_sequence_covers_every_row() {
        let lod = SequenceLod::from_lengths(&[5]).unwrap();
        assert_eq!(lod.offsets(), vec![0, 5]);
        assert_eq!(lod.sequence_ranges().collect::<Vec<_>>(), vec![0..5]);
    }

    #[test]
    fn test_rejects_invalid_layouts() {
        assert!(SequenceLod::new(&[]).is_err());
        assert!(SequenceLod::new(&[vec![1], vec![1]]).is_err());
        assert!(SequenceLod::from_lengths(&[]).is_err());
        assert!(SequenceLod::from_lengths(&[2, 0, 3]).is_err());
    }

    #[test]
    fn test_serde_uses_nested_lengths() {
        let lod = SequenceLod::from_lengths(&[2, 4, 3]).unwrap();
        let json = serde_json::to_string(&lod).unwrap();
        assert_eq!(json, "[[2,4,3]]");
        let parsed: SequenceLod = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, lod);
        assert!(serde_json::from_str::<SequenceLod>("[[2,0]]").is_err());
    }
}
