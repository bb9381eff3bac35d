//! Codon alphabet and the similarity model used to score aligned codon pairs.
//!
//! The model is built once from scalar parameters and the standard genetic
//! code, then consulted read-only for the lifetime of the process. Besides
//! the 64x64 pair-score matrix it carries the lookup tables needed to render
//! alignments (codon to amino-acid character, codon to base letters) and an
//! independent linear-time rescoring routine used to verify reported scores.

use thiserror::Error;

/// Signed score type for similarity values, penalties and DP cells.
pub type Score = i32;

/// One codon symbol.
///
/// Values `0..=63` identify the 64 three-base codons (`code = b0*16 + b1*4 +
/// b2` with a=0, g=1, c=2, t=3). Value `64` is the gap sentinel emitted into
/// reconstructed alignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Codon(pub u8);

impl Codon {
    /// Number of distinct non-sentinel codons.
    pub const COUNT: usize = 64;

    /// Gap sentinel (rendered as a hyphen).
    pub const HYPHEN: Codon = Codon(64);

    /// Representative stop codon (`taa`), also used to encode unknown
    /// characters.
    pub const STAR: Codon = Codon(48);

    /// Decode three base letters (case-insensitive `a`/`g`/`c`/`t`) into a
    /// codon. Returns `None` for any other letter.
    pub fn from_bases(bases: [u8; 3]) -> Option<Codon> {
        let mut code = 0u8;
        for base in bases {
            code = code * 4
                + match base.to_ascii_lowercase() {
                    b'a' => 0,
                    b'g' => 1,
                    b'c' => 2,
                    b't' => 3,
                    _ => return None,
                };
        }
        Some(Codon(code))
    }

    /// Whether this symbol is the gap sentinel.
    pub fn is_gap(self) -> bool {
        self.0 == Self::HYPHEN.0
    }

    /// Table index for this symbol.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Amino acids with their synonymous codons, in base-letter form.
///
/// Every one of the 64 codons appears exactly once; the trailing `*` group
/// holds the three stop codons.
const CODON_GROUPS: &[(char, &[&[u8; 3]])] = &[
    ('A', &[b"gct", b"gcc", b"gca", b"gcg"]),
    ('C', &[b"tgt", b"tgc"]),
    ('D', &[b"gat", b"gac"]),
    ('E', &[b"gaa", b"gag"]),
    ('F', &[b"ttt", b"ttc"]),
    ('G', &[b"ggt", b"ggc", b"gga", b"ggg"]),
    ('H', &[b"cat", b"cac"]),
    ('I', &[b"att", b"atc", b"ata"]),
    ('K', &[b"aaa", b"aag"]),
    ('L', &[b"ttg", b"tta", b"ctt", b"ctc", b"cta", b"ctg"]),
    ('M', &[b"atg"]),
    ('N', &[b"aat", b"aac"]),
    ('P', &[b"cct", b"ccc", b"cca", b"ccg"]),
    ('Q', &[b"caa", b"cag"]),
    ('R', &[b"cgt", b"cgc", b"cga", b"cgg", b"aga", b"agg"]),
    ('S', &[b"tct", b"tcc", b"tca", b"tcg", b"agt", b"agc"]),
    ('T', &[b"act", b"acc", b"aca", b"acg"]),
    ('V', &[b"gtt", b"gtc", b"gta", b"gtg"]),
    ('W', &[b"tgg"]),
    ('Y', &[b"tat", b"tac"]),
    ('*', &[b"taa", b"tag", b"tga"]),
];

/// Scalar parameters from which a [`SimilarityModel`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimilarityParams {
    /// Score for exactly matching codons. Must be positive.
    pub exact: Score,
    /// Score for distinct codons of the same amino acid.
    pub similar: Score,
    /// Score for codons of different amino acids. Must be negative.
    pub dissimilar: Score,
    /// Penalty charged once when a gap opens. Must be non-negative.
    pub gap_start: Score,
    /// Penalty charged per codon inside a gap. Must be positive.
    pub gap_extend: Score,
    /// Longest interesting match, including gaps. Bounds the scan band.
    pub match_limit: usize,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            exact: 5,
            similar: 4,
            dissimilar: -3,
            gap_start: 5,
            gap_extend: 2,
            match_limit: 66,
        }
    }
}

/// Errors raised while validating [`SimilarityParams`].
#[derive(Debug, Error)]
pub enum ModelError {
    /// The exact-match score was zero or negative.
    #[error("exact-match score must be positive, got {0}")]
    NonPositiveExact(Score),

    /// The dissimilar score was zero or positive.
    #[error("dissimilar score must be negative, got {0}")]
    NonNegativeDissimilar(Score),

    /// The gap-start penalty was negative.
    #[error("gap-start penalty must be non-negative, got {0}")]
    NegativeGapStart(Score),

    /// The gap-extend penalty was zero or negative.
    #[error("gap-extend penalty must be positive, got {0}")]
    NonPositiveGapExtend(Score),

    /// The match limit was zero.
    #[error("match limit must be positive")]
    ZeroMatchLimit,
}

/// Immutable codon similarity model.
///
/// Holds the pair-score matrix, the display tables and the gap penalties.
/// Index 64 of the display tables is the gap placeholder.
pub struct SimilarityModel {
    similarity: [[Score; Codon::COUNT]; Codon::COUNT],
    amino_acid: [u8; Codon::COUNT + 1],
    codon_bases: [[u8; 3]; Codon::COUNT + 1],
    encode: [u8; 128],
    params: SimilarityParams,
}

impl std::fmt::Debug for SimilarityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityModel")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl SimilarityModel {
    /// Build the model from scalar parameters and the standard genetic code.
    pub fn new(params: SimilarityParams) -> Result<Self, ModelError> {
        if params.exact <= 0 {
            return Err(ModelError::NonPositiveExact(params.exact));
        }
        if params.dissimilar >= 0 {
            return Err(ModelError::NonNegativeDissimilar(params.dissimilar));
        }
        if params.gap_start < 0 {
            return Err(ModelError::NegativeGapStart(params.gap_start));
        }
        if params.gap_extend <= 0 {
            return Err(ModelError::NonPositiveGapExtend(params.gap_extend));
        }
        if params.match_limit == 0 {
            return Err(ModelError::ZeroMatchLimit);
        }

        let mut amino_acid = [0u8; Codon::COUNT + 1];
        let mut codon_bases = [[0u8; 3]; Codon::COUNT + 1];
        let mut encode = [Codon::STAR.0; 128];
        amino_acid[Codon::HYPHEN.index()] = b'-';
        codon_bases[Codon::HYPHEN.index()] = *b"---";

        for (acid, codons) in CODON_GROUPS {
            let mut last = Codon::STAR;
            for bases in *codons {
                let codon = Codon::from_bases(**bases)
                    .unwrap_or_else(|| unreachable!("genetic code table holds agct only"));
                codon_bases[codon.index()] = **bases;
                amino_acid[codon.index()] = *acid as u8;
                last = codon;
            }
            // The encode table maps each amino acid to its last listed codon.
            encode[*acid as usize] = last.0;
        }

        let mut similarity = [[0; Codon::COUNT]; Codon::COUNT];
        for (i, row) in similarity.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = if i == j {
                    params.exact
                } else if amino_acid[i] == amino_acid[j] {
                    params.similar
                } else {
                    params.dissimilar
                };
            }
        }

        Ok(Self {
            similarity,
            amino_acid,
            codon_bases,
            encode,
            params,
        })
    }

    /// Pair score for two non-gap codons.
    pub fn similarity(&self, a: Codon, b: Codon) -> Score {
        assert!(
            a.index() < Codon::COUNT && b.index() < Codon::COUNT,
            "similarity lookup on sentinel codon ({}, {})",
            a.0,
            b.0
        );
        self.similarity[a.index()][b.index()]
    }

    /// Representative codon for an amino-acid or stop character. Unknown
    /// characters map to the stop representative.
    pub fn encode(&self, acid: char) -> Codon {
        let idx = acid as usize;
        if idx < self.encode.len() {
            Codon(self.encode[idx])
        } else {
            Codon::STAR
        }
    }

    /// Amino-acid character for a codon (gap sentinel renders as `-`).
    pub fn amino_acid(&self, codon: Codon) -> char {
        assert!(codon.index() <= Codon::COUNT, "codon out of range: {}", codon.0);
        self.amino_acid[codon.index()] as char
    }

    /// Base letters for a codon (gap sentinel renders as `---`).
    pub fn bases(&self, codon: Codon) -> [u8; 3] {
        assert!(codon.index() <= Codon::COUNT, "codon out of range: {}", codon.0);
        self.codon_bases[codon.index()]
    }

    /// Penalty to open a gap.
    pub fn gap_start(&self) -> Score {
        self.params.gap_start
    }

    /// Penalty per codon inside a gap.
    pub fn gap_extend(&self) -> Score {
        self.params.gap_extend
    }

    /// Combined penalty for the first codon of a new gap.
    pub fn gap_first(&self) -> Score {
        self.params.gap_start + self.params.gap_extend
    }

    /// Longest interesting match, including gaps.
    pub fn match_limit(&self) -> usize {
        self.params.match_limit
    }

    /// The parameters this model was built from.
    pub fn params(&self) -> SimilarityParams {
        self.params
    }

    /// Render a codon sequence as one amino-acid character per codon.
    pub fn amino_chain(&self, codons: &[Codon]) -> String {
        codons.iter().map(|&c| self.amino_acid(c)).collect()
    }

    /// Render a codon sequence as three base letters per codon, gaps as
    /// `---`.
    pub fn codon_chain(&self, codons: &[Codon]) -> String {
        let mut out = String::with_capacity(codons.len() * 3);
        for &codon in codons {
            let bases = self.bases(codon);
            out.push(bases[0] as char);
            out.push(bases[1] as char);
            out.push(bases[2] as char);
        }
        out
    }

    /// Score a reconstructed alignment pair from scratch.
    ///
    /// Walks the two equal-length sequences column by column, charging
    /// `gap_start` once at the first hyphen of each gap run and `gap_extend`
    /// for every hyphen. A run's open state resets only on a column where
    /// neither side is gapped, so back-to-back runs in the two sequences each
    /// pay their own opening penalty.
    pub fn rescore(&self, main: &[Codon], matched: &[Codon]) -> Score {
        let mut score = 0;
        let mut main_gap_open = false;
        let mut match_gap_open = false;
        let len = main.len().min(matched.len());
        for idx in 0..len {
            if main[idx].is_gap() {
                if !main_gap_open {
                    main_gap_open = true;
                    score -= self.params.gap_start;
                }
                score -= self.params.gap_extend;
                continue;
            }
            if matched[idx].is_gap() {
                if !match_gap_open {
                    match_gap_open = true;
                    score -= self.params.gap_start;
                }
                score -= self.params.gap_extend;
                continue;
            }
            main_gap_open = false;
            match_gap_open = false;
            score += self.similarity(main[idx], matched[idx]);
        }
        score
    }

    /// Encode a string of amino-acid characters into representative codons.
    pub fn encode_chain(&self, acids: &str) -> Vec<Codon> {
        acids.chars().map(|acid| self.encode(acid)).collect()
    }
}
