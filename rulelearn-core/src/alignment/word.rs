use crate::error::AlignmentError;
use crate::tree::Sentence;
use crate::types::*;
use std::collections::HashMap;

/// Maps leaf tokens to the integer ids word aligners consume.
///
/// Keys are the lowercased lemma plus primary tag, one table per side.
#[derive(Debug, Default)]
pub struct Vocabulary {
    left: HashMap<(String, String), u32>,
    right: HashMap<(String, String), u32>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self, side: Side, lemma: &str, tag: Option<&str>) -> u32 {
        let table = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        let key = (lemma.to_lowercase(), tag.unwrap_or_default().to_lowercase());
        let next = table.len() as u32;
        *table.entry(key).or_insert(next)
    }

    pub fn size(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left.len(),
            Side::Right => self.right.len(),
        }
    }

    /// Source and target leaf ids of `sentence`, in surface order.
    pub fn encode(&mut self, sentence: &Sentence) -> TokenPair {
        let mut side_ids = |side: Side| -> Vec<u32> {
            sentence
                .leaves(side)
                .iter()
                .map(|&leaf| {
                    let node = sentence.node(leaf);
                    self.id(side, &node.lemma, node.primary_tag())
                })
                .collect()
        };
        let sl = side_ids(Side::Left);
        let tl = side_ids(Side::Right);
        (sl, tl)
    }
}

impl Sentence {
    /// Merge word-aligner output into leaf alignments, symmetrically.
    ///
    /// Positions index each side's leaf sequence. Returns the number of
    /// links recorded.
    pub fn add_word_alignment(&mut self, alignment: &WordAlignment) -> Result<usize, AlignmentError> {
        let mut links = Vec::new();
        for (&sl_pos, tl_positions) in alignment {
            let sl = leaf_at(self, Side::Left, sl_pos)?;
            for &tl_pos in tl_positions {
                links.push((sl, leaf_at(self, Side::Right, tl_pos)?));
            }
        }
        for &(sl, tl) in &links {
            self.link(sl, tl);
        }
        Ok(links.len())
    }
}

fn leaf_at(sentence: &Sentence, side: Side, position: usize) -> Result<NodeId, AlignmentError> {
    let leaves = sentence.leaves(side);
    leaves
        .get(position)
        .copied()
        .ok_or(AlignmentError::PositionOutOfRange {
            side: side.label(),
            position,
            leaves: leaves.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Lu;

    fn sentence() -> Sentence {
        Sentence::new(
            &Lu::parse("^NP<NP>{^big<adj>$ ^dog<n>$}$").unwrap(),
            &Lu::parse("^NP<NP>{^el<det>$ ^perro<n>$ ^grande<adj>$}$").unwrap(),
        )
    }

    #[test]
    fn positions_map_to_leaves_symmetrically() {
        let mut s = sentence();
        let wa = WordAlignment::from([(0, vec![2]), (1, vec![1])]);
        assert_eq!(s.add_word_alignment(&wa).unwrap(), 2);
        // leaves: big=1 dog=2 | el=4 perro=5 grande=6
        assert!(s.node(1).alignment.contains(&6));
        assert!(s.node(6).alignment.contains(&1));
        assert!(s.node(2).alignment.contains(&5));
        assert!(s.node(4).alignment.is_empty());
    }

    #[test]
    fn one_to_many_links_are_kept() {
        let mut s = sentence();
        let wa = WordAlignment::from([(1, vec![0, 1])]);
        s.add_word_alignment(&wa).unwrap();
        assert_eq!(s.node(2).alignment.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn out_of_range_position_is_an_error() {
        let mut s = sentence();
        let wa = WordAlignment::from([(0, vec![0]), (1, vec![3])]);
        assert_eq!(
            s.add_word_alignment(&wa),
            Err(AlignmentError::PositionOutOfRange {
                side: "target",
                position: 3,
                leaves: 3
            })
        );
        // nothing applied on failure
        assert!(s.node(1).alignment.is_empty());
    }

    #[test]
    fn vocabulary_is_case_insensitive_per_side() {
        let mut vocab = Vocabulary::new();
        let a = vocab.id(Side::Left, "Dog", Some("n"));
        let b = vocab.id(Side::Left, "dog", Some("N"));
        let c = vocab.id(Side::Right, "dog", Some("n"));
        assert_eq!(a, b);
        assert_eq!(c, 0);
        assert_ne!(vocab.id(Side::Left, "dog", Some("vblex")), a);
        assert_eq!(vocab.size(Side::Left), 2);
    }

    #[test]
    fn encode_reuses_ids_across_sentences() {
        let mut vocab = Vocabulary::new();
        let s = sentence();
        let (sl, tl) = vocab.encode(&s);
        assert_eq!(sl, vec![0, 1]);
        assert_eq!(tl, vec![0, 1, 2]);
        assert_eq!(vocab.encode(&s), (sl, tl));
    }
}
