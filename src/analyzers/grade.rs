/// Converts an overall score (0–100) into a letter grade.
///
/// | Range   | Grade |
/// |---------|-------|
/// | >= 90   | A+    |
/// | >= 80   | A     |
/// | >= 65   | B     |
/// | >= 50   | C     |
/// | < 50    | D     |
pub fn grade(score: u8) -> String {
    match score {
        s if s >= 90 => "A+".into(),
        s if s >= 80 => "A".into(),
        s if s >= 65 => "B".into(),
        s if s >= 50 => "C".into(),
        _ => "D".into(),
    }
}
