// Submission batch runner tests

use super::fixtures;
use highline_watermark::batch::{process_submission, process_submission_async, ProcessingMode};
use highline_watermark::watermark::{UploadedFile, WatermarkProcessor};

fn submission() -> Vec<UploadedFile> {
    vec![
        UploadedFile::new(fixtures::pdf(&[(612, 792), (612, 792)]), "jan.pdf", "application/pdf"),
        UploadedFile::new(fixtures::jpeg(320, 240), "licence.jpg", "image/jpeg"),
        UploadedFile::new(&b"call me"[..], "notes.txt", "text/plain"),
        UploadedFile::new(fixtures::password_protected_pdf(), "feb.pdf", "application/pdf"),
        UploadedFile::new(fixtures::png(200, 200), "cheque.png", "image/png"),
    ]
}

#[test]
fn test_parallel_matches_sequential() {
    let processor = WatermarkProcessor::default();
    let files = submission();

    let sequential = process_submission(&processor, &files, ProcessingMode::Sequential);
    let parallel = process_submission(&processor, &files, ProcessingMode::Parallel { workers: 3 });

    assert_eq!(sequential, parallel);
}

#[test]
fn test_results_follow_input_order() {
    let processor = WatermarkProcessor::default();
    let results = process_submission(&processor, &submission(), ProcessingMode::Parallel { workers: 2 });

    let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["WM_jan.pdf", "WM_licence.jpg", "notes.txt", "feb.pdf", "WM_cheque.png"]
    );
}

#[tokio::test]
async fn test_async_runner_matches_sequential() {
    let processor = WatermarkProcessor::default();
    let files = submission();

    let expected = process_submission(&processor, &files, ProcessingMode::Sequential);
    let actual = process_submission_async(processor, files).await;

    assert_eq!(actual, expected);
}
