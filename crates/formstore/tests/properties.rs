use formstore::{FieldStorage, FormConfig, FormRequest, Method, parse_header, parse_qs};
use proptest::prelude::*;

fn config() -> FormConfig {
    FormConfig::new()
        .max_part_size(64 * 1024)
        .max_total_size(256 * 1024)
        .max_fields(256)
        .max_depth(4)
}

proptest! {
    #[test]
    fn decoder_never_panics_on_arbitrary_bodies(body in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let request = FormRequest::new(Method::Post, &body[..])
            .content_type("multipart/form-data; boundary=xyz");
        let _ = FieldStorage::parse_with(request, &config());
    }

    #[test]
    fn decoder_never_panics_on_boundary_heavy_bodies(
        lines in proptest::collection::vec(
            prop_oneof![
                Just("--xyz".to_string()),
                Just("--xyz--".to_string()),
                Just(String::new()),
                Just("Content-Disposition: form-data; name=\"a\"".to_string()),
                Just("Content-Type: multipart/mixed; boundary=xyz".to_string()),
                Just("Content-Length: 3".to_string()),
                "[a-z=&%-]{0,12}",
            ],
            0..64,
        )
    ) {
        let body = lines.join("\r\n");
        let request = FormRequest::new(Method::Post, body.as_bytes())
            .content_type("multipart/form-data; boundary=xyz");
        if let Ok(form) = FieldStorage::parse_with(request, &config()) {
            // Every buffered value must be readable twice with equal results.
            if let Ok(fields) = form.fields() {
                for field in fields {
                    prop_assert_eq!(field.text().ok(), field.text().ok());
                }
            }
        }
    }

    #[test]
    fn query_values_are_never_empty(qs in "[a-z=&%+0-9]{0,64}") {
        for (_, values) in parse_qs(&qs) {
            prop_assert!(values.iter().all(|v| !v.is_empty()));
        }
    }

    #[test]
    fn header_keys_are_lower_case(line in "[A-Za-z;= \"-]{0,64}") {
        let (token, params) = parse_header(&line);
        prop_assert_eq!(token.clone(), token.to_lowercase());
        for (key, _) in params.iter() {
            prop_assert_eq!(key.to_string(), key.to_lowercase());
        }
    }
}
