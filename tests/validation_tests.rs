use screenrec::format::Rational;
use screenrec::validation::{
    validate_depth, validate_frame_rate, validate_key_frame_interval, validate_mime_type,
    validate_output_dir, validate_quality,
};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_frame_rate_valid() {
        assert!(validate_frame_rate(Rational::from_integer(1)).is_ok());
        assert!(validate_frame_rate(Rational::from_integer(15)).is_ok());
        assert!(validate_frame_rate(Rational::new(30000, 1001)).is_ok());
        assert!(validate_frame_rate(Rational::from_integer(120)).is_ok());
    }

    #[test]
    fn test_validate_frame_rate_invalid() {
        assert!(validate_frame_rate(Rational::from_integer(0)).is_err());
        assert!(validate_frame_rate(Rational::new(15, 0)).is_err());
        assert!(validate_frame_rate(Rational::from_integer(121)).is_err());
    }

    #[test]
    fn test_validate_quality() {
        assert!(validate_quality(0.0).is_ok());
        assert!(validate_quality(0.75).is_ok());
        assert!(validate_quality(1.0).is_ok());
        assert!(validate_quality(-0.1).is_err());
        assert!(validate_quality(1.01).is_err());
        assert!(validate_quality(f32::NAN).is_err());
    }

    #[test]
    fn test_validate_depth() {
        for depth in [8, 16, 24, 32] {
            assert!(validate_depth(depth).is_ok());
        }
        assert!(validate_depth(0).is_err());
        assert!(validate_depth(15).is_err());
        assert!(validate_depth(48).is_err());
    }

    #[test]
    fn test_validate_key_frame_interval() {
        assert!(validate_key_frame_interval(1).is_ok());
        assert!(validate_key_frame_interval(900).is_ok());
        assert!(validate_key_frame_interval(0).is_err());
    }

    #[test]
    fn test_validate_mime_type() {
        assert!(validate_mime_type("video/avi").is_ok());
        assert!(validate_mime_type("video/quicktime").is_err());
        assert!(validate_mime_type("").is_err());
    }

    #[test]
    fn test_validate_output_dir() {
        let dir = TempDir::new().unwrap();
        assert!(validate_output_dir(dir.path()).is_ok());
        // Not created yet, but creatable
        assert!(validate_output_dir(&dir.path().join("a").join("b")).is_ok());

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(validate_output_dir(&file).is_err());
        assert!(validate_output_dir(&file.join("below")).is_err());
    }
}
