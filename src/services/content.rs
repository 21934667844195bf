//! Content similarity over movie metadata.
//!
//! Each movie is reduced to one combined text field, vectorized with TF-IDF
//! (unigrams and bigrams, English stop words removed, smooth idf, l2-normalized
//! rows) and compared with cosine similarity. Because rows are unit length and
//! all weights are non-negative, cosine similarity is a plain sparse dot product
//! in `[0, 1]`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::models::{Movie, MovieId};

/// Number of billed cast members included in the combined text
const CAST_LIMIT: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "am", "among",
    "an", "and", "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "either", "else", "even", "ever", "every", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "however", "if", "in", "into", "is", "it", "its", "itself", "just", "least",
    "less", "many", "may", "me", "might", "more", "most", "much", "must", "my", "myself",
    "neither", "no", "nor", "not", "now", "of", "off", "often", "on", "once", "only", "or",
    "other", "our", "ours", "ourselves", "out", "over", "own", "per", "rather", "same", "she",
    "should", "since", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "though", "through", "thus",
    "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we", "well", "were",
    "what", "when", "where", "whether", "which", "while", "who", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Sparse row with strictly increasing term indices
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Fitted TF-IDF model over the movie catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentModel {
    movie_ids: Vec<MovieId>,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    rows: Vec<SparseVector>,
    #[serde(skip)]
    index: HashMap<MovieId, usize>,
}

impl ContentModel {
    /// Vectorizes the catalog, keeping at most `max_features` terms
    pub fn fit(movies: &[Movie], max_features: usize) -> Self {
        let documents: Vec<Vec<String>> = movies
            .iter()
            .map(|movie| analyze(&combined_text(movie)))
            .collect();

        // Corpus frequency decides which terms survive the cap; ties go alphabetical.
        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &documents {
            for term in doc {
                *corpus_counts.entry(term.as_str()).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut vocabulary: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();
        let term_index: HashMap<&str, u32> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i as u32))
            .collect();

        let counts: Vec<BTreeMap<u32, f64>> = documents
            .iter()
            .map(|doc| {
                let mut tf = BTreeMap::new();
                for term in doc {
                    if let Some(&idx) = term_index.get(term.as_str()) {
                        *tf.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                tf
            })
            .collect();

        let n = movies.len() as f64;
        let mut df = vec![0usize; vocabulary.len()];
        for tf in &counts {
            for &idx in tf.keys() {
                df[idx as usize] += 1;
            }
        }
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .into_iter()
            .map(|tf| {
                let mut row = SparseVector {
                    indices: Vec::with_capacity(tf.len()),
                    values: Vec::with_capacity(tf.len()),
                };
                for (idx, count) in tf {
                    row.indices.push(idx);
                    row.values.push(count * idf[idx as usize]);
                }
                let norm = row.values.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.values.iter_mut().for_each(|v| *v /= norm);
                }
                row
            })
            .collect();

        let mut model = Self {
            movie_ids: movies.iter().map(|m| m.movie_id).collect(),
            vocabulary,
            idf,
            rows,
            index: HashMap::new(),
        };
        model.reindex();

        tracing::info!(
            movies = model.movie_ids.len(),
            features = model.vocabulary.len(),
            nnz = model.rows.iter().map(SparseVector::nnz).sum::<usize>(),
            "TF-IDF model fitted"
        );

        model
    }

    /// Rebuilds the id lookup after deserialization
    pub(crate) fn reindex(&mut self) {
        self.index = self
            .movie_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
    }

    /// (movies, features)
    pub fn shape(&self) -> (usize, usize) {
        (self.movie_ids.len(), self.vocabulary.len())
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.index.contains_key(&movie_id)
    }

    /// Cosine similarity between two movies
    pub fn similarity(&self, a: MovieId, b: MovieId) -> Option<f64> {
        let ra = &self.rows[*self.index.get(&a)?];
        let rb = &self.rows[*self.index.get(&b)?];
        Some(ra.dot(rb).clamp(0.0, 1.0))
    }

    /// Similarity of `movie_id` to every other movie in the catalog
    pub fn similarities(&self, movie_id: MovieId) -> Option<HashMap<MovieId, f64>> {
        let reference = &self.rows[*self.index.get(&movie_id)?];
        Some(
            self.movie_ids
                .iter()
                .zip(&self.rows)
                .filter(|(&id, _)| id != movie_id)
                .map(|(&id, row)| (id, reference.dot(row).clamp(0.0, 1.0)))
                .collect(),
        )
    }

    /// Terms selected for the vocabulary, sorted
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }
}

/// Builds the single text field a movie is vectorized from
///
/// The director is repeated so that it weighs more than any one cast member.
pub fn combined_text(movie: &Movie) -> String {
    let cast = movie
        .cast_members()
        .into_iter()
        .take(CAST_LIMIT)
        .collect::<Vec<_>>()
        .join(" ");

    let combined = [
        movie.overview.as_str(),
        movie.genre.as_str(),
        cast.as_str(),
        movie.director.as_str(),
        movie.director.as_str(),
        movie.tagline.as_str(),
        movie.original_language.as_str(),
    ]
    .join(" ");

    combined
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Tokenizes, drops stop words and appends adjacent-token bigrams
fn analyze(text: &str) -> Vec<String> {
    let stop = stop_words();
    let unigrams: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !stop.contains(t))
        .map(str::to_string)
        .collect();

    let bigrams: Vec<String> = unigrams
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();

    unigrams.into_iter().chain(bigrams).collect()
}
