use std::path::Path;

use mime_guess::mime;

/// Content-Type for a file, guessed from its extension.
///
/// Unknown extensions are `application/octet-stream`. Text types without
/// an explicit charset are served as UTF-8.
pub fn content_type_for(path: &Path) -> String {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
        format!("{guessed}; charset=utf-8")
    } else {
        guessed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(content_type_for(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("site.css")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("data.csv")), "text/csv; charset=utf-8");
        assert_eq!(content_type_for(Path::new("Makefile")), "application/octet-stream");
    }
}
