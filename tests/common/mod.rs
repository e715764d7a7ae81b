use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the two-row survey upload used across the end-to-end tests.
pub fn write_survey_csv(dir: &Path) -> PathBuf {
    let path = dir.join("ankieta.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "Wiek,Płeć").unwrap();
    writeln!(file, "25-34,Kobieta").unwrap();
    writeln!(file, "<18,Mężczyzna").unwrap();
    path
}

/// A larger upload with experience and education columns.
pub fn write_full_survey_csv(dir: &Path) -> PathBuf {
    let path = dir.join("ankieta_pelna.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "Wiek;Years_of_experience;Edukacja;Płeć").unwrap();
    writeln!(file, "25-34;0-2;Wyższe;Kobieta").unwrap();
    writeln!(file, "35-44;>=5;Średnie;Mężczyzna").unwrap();
    writeln!(file, "18-24;nie wiem;Wyższe;Kobieta").unwrap();
    writeln!(file, "45-54;>=10;Podstawowe;Mężczyzna").unwrap();
    path
}
