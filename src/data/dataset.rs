use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{DatasetStats, Movie, MovieId, Rating, UserId},
};

/// Movie metadata and user ratings, as loaded for training
#[derive(Debug, Clone)]
pub struct Dataset {
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
}

impl Dataset {
    /// Loads the JSON movie table and the CSV ratings table
    pub fn load(movies_path: impl AsRef<Path>, ratings_path: impl AsRef<Path>) -> AppResult<Self> {
        let movies = load_movies(movies_path)?;
        let ratings = load_ratings(ratings_path)?;
        let dataset = Self::from_parts(movies, ratings)?;

        tracing::info!(
            movies = dataset.movies.len(),
            ratings = dataset.ratings.len(),
            "Dataset loaded"
        );

        Ok(dataset)
    }

    /// Validates and cleans raw records
    ///
    /// Rejects empty tables and duplicate movie ids. Ratings for unknown movies
    /// are dropped, and a repeated (user, movie) pair keeps its last observation.
    pub fn from_parts(movies: Vec<Movie>, ratings: Vec<Rating>) -> AppResult<Self> {
        if movies.is_empty() {
            return Err(AppError::InvalidDataset("movie table is empty".to_string()));
        }
        if ratings.is_empty() {
            return Err(AppError::InvalidDataset("ratings table is empty".to_string()));
        }

        let mut ids = HashSet::with_capacity(movies.len());
        for movie in &movies {
            if !ids.insert(movie.movie_id) {
                return Err(AppError::InvalidDataset(format!(
                    "duplicate movie_id {}",
                    movie.movie_id
                )));
            }
        }

        let total = ratings.len();
        let mut latest: HashMap<(UserId, MovieId), usize> = HashMap::new();
        let mut kept: Vec<Rating> = Vec::with_capacity(total);
        let mut unknown = 0usize;

        for rating in ratings {
            if !ids.contains(&rating.movie_id) {
                unknown += 1;
                continue;
            }
            match latest.get(&(rating.user_id, rating.movie_id)) {
                Some(&pos) => kept[pos] = rating,
                None => {
                    latest.insert((rating.user_id, rating.movie_id), kept.len());
                    kept.push(rating);
                }
            }
        }

        if unknown > 0 {
            tracing::warn!(dropped = unknown, "Ratings reference unknown movies");
        }
        if kept.len() + unknown < total {
            tracing::info!(
                duplicates = total - unknown - kept.len(),
                "Collapsed repeated ratings to their last observation"
            );
        }
        if kept.is_empty() {
            return Err(AppError::InvalidDataset(
                "no ratings reference a known movie".to_string(),
            ));
        }

        Ok(Self {
            movies,
            ratings: kept,
        })
    }

    pub fn stats(&self) -> DatasetStats {
        let users: HashSet<UserId> = self.ratings.iter().map(|r| r.user_id).collect();
        DatasetStats {
            movies: self.movies.len(),
            ratings: self.ratings.len(),
            users: users.len(),
        }
    }
}

/// Reads a JSON array of movie records
pub fn load_movies(path: impl AsRef<Path>) -> AppResult<Vec<Movie>> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "Loading movies");
    let file = open(path)?;
    let movies: Vec<Movie> = serde_json::from_reader(BufReader::new(file))?;
    Ok(movies)
}

/// Reads a `userId,movieId,rating` CSV table
pub fn load_ratings(path: impl AsRef<Path>) -> AppResult<Vec<Rating>> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "Loading ratings");
    let file = open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let ratings = reader
        .deserialize()
        .collect::<Result<Vec<Rating>, _>>()?;
    Ok(ratings)
}

fn open(path: &Path) -> AppResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::InvalidDataset(format!("data file not found: {}", path.display()))
        }
        _ => AppError::Io(e),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_files() {
        let mut movies_file = NamedTempFile::new().unwrap();
        write!(
            movies_file,
            r#"[{{"movie_id": 1, "title": "Toy Story", "genre": "Animation", "rating": 3.8}},
                {{"movie_id": 2, "title": "Inception", "rating": 4.2}}]"#
        )
        .unwrap();

        let mut ratings_file = NamedTempFile::new().unwrap();
        writeln!(ratings_file, "userId,movieId,rating").unwrap();
        writeln!(ratings_file, "1,1,4.0").unwrap();
        writeln!(ratings_file, "1,2,5.0").unwrap();
        writeln!(ratings_file, "2,1,3.5").unwrap();

        let dataset = Dataset::load(movies_file.path(), ratings_file.path()).unwrap();
        assert_eq!(dataset.movies.len(), 2);
        assert_eq!(dataset.ratings.len(), 3);
        assert_eq!(
            dataset.stats(),
            DatasetStats {
                movies: 2,
                ratings: 3,
                users: 2
            }
        );
    }

    #[test]
    fn test_missing_file_is_invalid_dataset() {
        let err = load_movies("/nonexistent/movies.json").unwrap_err();
        assert!(matches!(err, AppError::InvalidDataset(_)));
    }

    #[test]
    fn test_empty_tables_rejected() {
        let err = Dataset::from_parts(vec![], fixtures::ratings()).unwrap_err();
        assert!(matches!(err, AppError::InvalidDataset(_)));

        let err = Dataset::from_parts(fixtures::movies(), vec![]).unwrap_err();
        assert!(matches!(err, AppError::InvalidDataset(_)));
    }

    #[test]
    fn test_duplicate_movie_id_rejected() {
        let mut movies = fixtures::movies();
        movies.push(movies[0].clone());
        let err = Dataset::from_parts(movies, fixtures::ratings()).unwrap_err();
        assert!(err.to_string().contains("duplicate movie_id 1"));
    }

    #[test]
    fn test_last_rating_wins_and_unknown_movies_dropped() {
        let ratings = vec![
            Rating { user_id: 1, movie_id: 1, rating: 2.0 },
            Rating { user_id: 1, movie_id: 99, rating: 5.0 },
            Rating { user_id: 1, movie_id: 1, rating: 4.0 },
        ];
        let dataset = Dataset::from_parts(fixtures::movies(), ratings).unwrap();
        assert_eq!(dataset.ratings.len(), 1);
        assert_eq!(dataset.ratings[0].rating, 4.0);
    }
}
