// End-to-end tests for process_file_with_watermark

use super::fixtures::{self, Security};
use highline_watermark::watermark::{
    process_file_with_watermark, FileKind, UploadedFile, WatermarkProcessor, WatermarkSettings,
};
use image::GenericImageView;
use lopdf::Document;

#[test]
fn test_jpeg_statement_photo_is_watermarked() {
    // 600x400 JPEG photo of a statement
    let upload = UploadedFile::new(fixtures::jpeg(600, 400), "photo.jpg", "image/jpeg");
    let processed = process_file_with_watermark(&upload);

    assert!(processed.watermarked);
    assert_eq!(processed.kind, FileKind::Image);
    assert_eq!(processed.filename, "WM_photo.jpg");
    assert_ne!(processed.data, upload.data);

    assert_eq!(
        image::guess_format(&processed.data).unwrap(),
        image::ImageFormat::Jpeg
    );
    let decoded = image::load_from_memory(&processed.data).unwrap();
    assert_eq!(decoded.dimensions(), (600, 400));
}

#[test]
fn test_password_protected_pdf_is_passed_through() {
    let upload = UploadedFile::new(
        fixtures::password_protected_pdf(),
        "locked.pdf",
        "application/pdf",
    );
    let processed = process_file_with_watermark(&upload);

    assert!(!processed.watermarked);
    assert_eq!(processed.kind, FileKind::Pdf);
    assert_eq!(processed.filename, "locked.pdf");
    assert_eq!(processed.data, upload.data);
}

#[test]
fn test_edit_restricted_statement_is_watermarked() {
    let upload = UploadedFile::new(
        fixtures::owner_only_pdf(Security::Aes128),
        "statement.pdf",
        "application/pdf",
    );
    let processed = process_file_with_watermark(&upload);

    assert!(processed.watermarked);
    assert_eq!(processed.filename, "WM_statement.pdf");

    let doc = Document::load_mem(&processed.data).unwrap();
    assert!(doc.is_encrypted());
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_text_file_is_passed_through() {
    let upload = UploadedFile::new(&b"call me back"[..], "notes.txt", "text/plain");
    let processed = process_file_with_watermark(&upload);

    assert!(!processed.watermarked);
    assert_eq!(processed.kind, FileKind::Other);
    assert_eq!(processed.filename, "notes.txt");
    assert_eq!(processed.data, upload.data);
}

#[test]
fn test_three_page_statement_stamps_every_page() {
    let sizes = [(612, 792), (595, 842), (792, 612)];
    let upload = UploadedFile::new(fixtures::pdf(&sizes), "statement.pdf", "application/pdf");
    let processed = process_file_with_watermark(&upload);

    assert!(processed.watermarked);
    assert_eq!(processed.filename, "WM_statement.pdf");

    let doc = Document::load_mem(&processed.data).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);

    for (number, (width, height)) in (1u32..).zip(sizes.iter()) {
        let page_id = pages[&number];
        assert_eq!(
            fixtures::media_box(&doc, page_id),
            (*width as f32, *height as f32)
        );
        assert!(fixtures::count_ops(&doc, page_id, "Tj") > 1);
    }
}

#[test]
fn test_unchanged_means_byte_identical() {
    let inputs = vec![
        UploadedFile::new(&b"\x89PNG broken"[..], "scan.png", "image/png"),
        UploadedFile::new(&b"%PDF-1.7 truncated"[..], "scan.pdf", "application/pdf"),
        UploadedFile::new(fixtures::empty_pdf(), "empty.pdf", "application/pdf"),
        UploadedFile::new(fixtures::jpeg(32, 32), "scan", "image/jpeg"),
        UploadedFile::new(Vec::new(), "blank.jpg", "image/jpeg"),
    ];

    for upload in inputs {
        let processed = process_file_with_watermark(&upload);
        assert!(!processed.watermarked, "{} should not be stamped", upload.filename);
        assert_eq!(processed.data, upload.data);
        assert_eq!(processed.filename, upload.filename);
    }
}

#[test]
fn test_mismatched_extension_degrades() {
    // PDF bytes under an image name go to the image path and fail to decode
    let upload = UploadedFile::new(fixtures::letter_pdf(), "statement.jpg", "image/jpeg");
    let processed = process_file_with_watermark(&upload);

    assert_eq!(processed.kind, FileKind::Image);
    assert!(!processed.watermarked);
    assert_eq!(processed.data, upload.data);
}

#[test]
fn test_uppercase_extension_is_watermarked() {
    let upload = UploadedFile::new(fixtures::png(200, 120), "SCAN.PNG", "image/png");
    let processed = process_file_with_watermark(&upload);

    assert!(processed.watermarked);
    assert_eq!(processed.filename, "WM_SCAN.PNG");
}

#[test]
fn test_watermarking_twice_layers_again() {
    let first = process_file_with_watermark(&UploadedFile::new(
        fixtures::letter_pdf(),
        "a.pdf",
        "application/pdf",
    ));
    let second = process_file_with_watermark(&UploadedFile::new(
        first.data.clone(),
        first.filename.clone(),
        "application/pdf",
    ));

    assert!(second.watermarked);
    assert_eq!(second.filename, "WM_WM_a.pdf");
    assert_ne!(second.data, first.data);

    let once = Document::load_mem(&first.data).unwrap();
    let twice = Document::load_mem(&second.data).unwrap();
    let once_runs = fixtures::count_ops(&once, once.get_pages()[&1], "Tj");
    let twice_runs = fixtures::count_ops(&twice, twice.get_pages()[&1], "Tj");
    assert_eq!(twice_runs, once_runs * 2 - 1);
}

#[test]
fn test_large_statement_is_watermarked_by_default() {
    let upload = UploadedFile::new(
        fixtures::padded_letter_pdf(30 * 1024 * 1024),
        "scan.pdf",
        "application/pdf",
    );
    assert!(upload.data.len() > 25 * 1024 * 1024);

    let processed = process_file_with_watermark(&upload);
    assert!(processed.watermarked);
    assert_eq!(processed.filename, "WM_scan.pdf");
    assert_eq!(WatermarkSettings::default().max_file_size_bytes, None);
}

#[test]
fn test_size_limit_applies_to_images_and_pdfs() {
    let processor = WatermarkProcessor::new(WatermarkSettings {
        max_file_size_bytes: Some(64),
        ..WatermarkSettings::default()
    });

    for upload in [
        UploadedFile::new(fixtures::jpeg(100, 100), "big.jpg", "image/jpeg"),
        UploadedFile::new(fixtures::letter_pdf(), "big.pdf", "application/pdf"),
    ] {
        let processed = processor.process(&upload);
        assert!(!processed.watermarked);
        assert_eq!(processed.data, upload.data);
    }
}
