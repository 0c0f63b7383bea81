// Attachment builder tests

use super::fixtures;
use highline_watermark::attachments::{attachments_for, AttachmentSet, DocumentLabel};
use highline_watermark::watermark::{process_file_with_watermark, UploadedFile};
use tempfile::TempDir;

#[test]
fn test_stamped_statement_attaches_both_copies() {
    let upload = UploadedFile::new(fixtures::letter_pdf(), "march.pdf", "application/pdf");
    let processed = process_file_with_watermark(&upload);

    let attachments = attachments_for(&DocumentLabel::Statement(1), &upload, &processed);
    let names: Vec<_> = attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["ORIGINAL_Statement1_march.pdf", "WATERMARKED_Statement1_march.pdf"]
    );
    assert_eq!(attachments[0].content, upload.data);
    assert_eq!(attachments[1].content, processed.data);
}

#[test]
fn test_unstamped_upload_attaches_original_only() {
    let upload = UploadedFile::new(
        fixtures::password_protected_pdf(),
        "locked.pdf",
        "application/pdf",
    );
    let processed = process_file_with_watermark(&upload);

    let attachments = attachments_for(&DocumentLabel::VoidCheque, &upload, &processed);
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].filename, "ORIGINAL_VC_locked.pdf");
    assert_eq!(attachments[0].content, upload.data);
}

#[test]
fn test_write_to_dir() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("nested").join("out");

    let upload = UploadedFile::new(fixtures::png(120, 80), "licence.png", "image/png");
    let processed = process_file_with_watermark(&upload);

    let mut set = AttachmentSet::new();
    set.add(&DocumentLabel::DriversLicence, &upload, &processed);
    let written = set.write_to_dir(&out_dir).unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(
        std::fs::read(out_dir.join("ORIGINAL_DL_licence.png")).unwrap(),
        upload.data.to_vec()
    );
    assert_eq!(
        std::fs::read(out_dir.join("WATERMARKED_DL_licence.png")).unwrap(),
        processed.data.to_vec()
    );
}

#[test]
fn test_write_to_unwritable_dir_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"in the way").unwrap();

    let mut set = AttachmentSet::new();
    let upload = UploadedFile::new(&b"x"[..], "a.txt", "text/plain");
    set.add(
        &DocumentLabel::Statement(1),
        &upload,
        &process_file_with_watermark(&upload),
    );

    let err = set.write_to_dir(&blocker.join("sub")).unwrap_err();
    assert!(err.to_string().starts_with("Failed to write"));
}

#[test]
fn test_client_paths_stay_inside_output_dir() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("out");

    let mut set = AttachmentSet::new();
    for name in ["../escaped.txt", "batch/escaped.txt"] {
        let upload = UploadedFile::new(&b"note"[..], name, "text/plain");
        set.add(
            &DocumentLabel::DriversLicence,
            &upload,
            &process_file_with_watermark(&upload),
        );
    }
    let written = set.write_to_dir(&out_dir).unwrap();

    assert_eq!(
        written,
        vec![
            out_dir.join("ORIGINAL_DL_escaped.txt"),
            out_dir.join("ORIGINAL_DL_escaped-2.txt"),
        ]
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 2);
}
