// End-to-end pipeline tests over synthetic in-memory PDFs.
use billsnap::extract::ocr::{OcrEngine, Recognizer};
use billsnap::extract::{ExtractionStrategy, OcrStrategy, TextLayerStrategy};
use billsnap::{process_document, process_document_with_strategies, OutputKind, PipelineError};
use chrono::NaiveDate;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GrayImage;
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use std::time::Instant;

/// Build a PDF with one content stream per page.
fn build_pdf(page_streams: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for stream in page_streams {
        let content_id = doc.add_object(Stream::new(dictionary! {}, stream.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF serialization");
    bytes
}

/// Build a scanned-style PDF: one page whose only content is a
/// grayscale image XObject (raw or Flate-compressed), no text layer.
fn build_scanned_pdf(width: u32, height: u32, flate: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let samples = vec![255u8; (width * height) as usize];
    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => 8,
    };
    let body = if flate {
        image_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples).unwrap();
        encoder.finish().unwrap()
    } else {
        samples
    };
    let image_id = doc.add_object(Stream::new(image_dict, body));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/Im0 Do\nQ\n");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF serialization");
    bytes
}

fn text_at(x: u32, y: u32, text: &str) -> String {
    format!("1 0 0 1 {x} {y} Tm\n({text}) Tj\n")
}

fn table_statement_pdf() -> Vec<u8> {
    let mut stream = String::from("BT\n/F1 12 Tf\n");
    stream.push_str(&text_at(72, 700, "Date"));
    stream.push_str(&text_at(200, 700, "Details"));
    stream.push_str(&text_at(400, 700, "Amount"));
    stream.push_str(&text_at(72, 680, "01/01/2024"));
    stream.push_str(&text_at(200, 680, "Grocery"));
    stream.push_str(&text_at(400, 680, "500.00"));
    stream.push_str("ET\n");
    build_pdf(&[stream])
}

#[test]
fn table_page_end_to_end() {
    let pdf = table_statement_pdf();
    let output = process_document(&pdf, OutputKind::DelimitedText).unwrap();

    assert_eq!(output.summary.transaction_count, 1);
    assert!((output.summary.amount_total - 500.0).abs() < f64::EPSILON);

    let record = &output.table.records()[0];
    assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(record.description, "Grocery");
    assert!((record.amount - 500.0).abs() < f64::EPSILON);

    let csv = String::from_utf8(output.artifact.bytes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["Date,Description,Amount", "2024-01-01,Grocery,500.00"]);
    assert_eq!(output.artifact.filename, "processed_statement.csv");
}

#[test]
fn text_lines_fall_back_to_the_line_parser() {
    let mut stream = String::from("BT\n/F1 12 Tf\n");
    stream.push_str(&text_at(72, 720, "STATEMENT OF ACCOUNT"));
    stream.push_str(&text_at(72, 700, "15/03/2024  AMAZON PURCHASE  1,250.00"));
    stream.push_str(&text_at(72, 680, "18/03/2024  COFFEE SHOP  4.50"));
    stream.push_str(&text_at(72, 660, "Closing balance"));
    stream.push_str("ET\n");
    let pdf = build_pdf(&[stream]);

    let output = process_document(&pdf, OutputKind::DelimitedText).unwrap();
    assert_eq!(output.summary.transaction_count, 2);

    let records = output.table.records();
    assert_eq!(records[0].description, "AMAZON PURCHASE");
    assert!((records[0].amount - 1250.0).abs() < f64::EPSILON);
    assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
}

#[test]
fn identical_lines_deduplicate_to_one_record() {
    let mut stream = String::from("BT\n/F1 12 Tf\n");
    stream.push_str(&text_at(72, 700, "15/03/2024  AMAZON PURCHASE  1,250.00"));
    stream.push_str(&text_at(72, 680, "15/03/2024  AMAZON PURCHASE  1,250.00"));
    stream.push_str("ET\n");
    let pdf = build_pdf(&[stream]);

    let output = process_document(&pdf, OutputKind::DelimitedText).unwrap();
    assert_eq!(output.summary.transaction_count, 1);
}

#[test]
fn empty_document_is_no_table_found() {
    let pdf = build_pdf(&["".to_string()]);
    let err = process_document(&pdf, OutputKind::DelimitedText).unwrap_err();
    assert!(matches!(err, PipelineError::NoTableFound));
}

#[test]
fn garbage_bytes_are_a_malformed_document() {
    let err = process_document(b"definitely not a pdf", OutputKind::DelimitedText).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedDocument(_)));
}

#[test]
fn unusable_rows_surface_as_all_rows_invalid() {
    let mut stream = String::from("BT\n/F1 12 Tf\n");
    stream.push_str(&text_at(72, 700, "Date"));
    stream.push_str(&text_at(200, 700, "Details"));
    stream.push_str(&text_at(400, 700, "Amount"));
    stream.push_str(&text_at(72, 680, "99/99/9999"));
    stream.push_str(&text_at(200, 680, "Mystery"));
    stream.push_str(&text_at(400, 680, "abc"));
    stream.push_str("ET\n");
    let pdf = build_pdf(&[stream]);

    let err = process_document(&pdf, OutputKind::DelimitedText).unwrap_err();
    match err {
        PipelineError::AllRowsInvalid { extracted } => assert_eq!(extracted, 1),
        other => panic!("expected AllRowsInvalid, got {other:?}"),
    }
}

#[test]
fn broken_page_does_not_discard_the_rest_of_the_document() {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    // First page's Contents points at an object that does not exist.
    let dangling = doc.new_object_id();
    let broken_page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => dangling,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    let mut stream = String::from("BT\n/F1 12 Tf\n");
    stream.push_str(&text_at(72, 700, "18/03/2024  COFFEE SHOP  4.50"));
    stream.push_str("ET\n");
    let content_id = doc.add_object(Stream::new(dictionary! {}, stream.into_bytes()));
    let good_page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![broken_page_id.into(), good_page_id.into()],
            "Count" => 2,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF serialization");

    let output = process_document(&bytes, OutputKind::DelimitedText).unwrap();
    assert_eq!(output.summary.transaction_count, 1);
    assert_eq!(output.table.records()[0].description, "COFFEE SHOP");
}

#[test]
fn pipeline_is_idempotent_on_identical_input() {
    let pdf = table_statement_pdf();
    let first = process_document(&pdf, OutputKind::DelimitedText).unwrap();
    let second = process_document(&pdf, OutputKind::DelimitedText).unwrap();
    assert_eq!(first.artifact.bytes, second.artifact.bytes);
}

#[test]
fn spreadsheet_kind_yields_an_xlsx_container() {
    let pdf = table_statement_pdf();
    let output = process_document(&pdf, OutputKind::Spreadsheet).unwrap();
    assert_eq!(&output.artifact.bytes[..4], b"PK\x03\x04");
    assert_eq!(output.artifact.filename, "processed_statement.xlsx");
    assert_eq!(
        output.artifact.content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

struct ScriptedRecognizer(Vec<&'static str>);

impl Recognizer for ScriptedRecognizer {
    fn recognize(&mut self, _image: &GrayImage, _deadline: Instant) -> anyhow::Result<String> {
        if self.0.is_empty() {
            anyhow::bail!("no more pages scripted");
        }
        Ok(self.0.remove(0).to_string())
    }
}

#[test]
fn scanned_document_falls_back_to_ocr() {
    let pdf = build_scanned_pdf(8, 8, false);

    let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
        Box::new(TextLayerStrategy),
        Box::new(OcrStrategy::with_engine(OcrEngine::with_recognizer(Box::new(
            ScriptedRecognizer(vec!["01/01/2024 Grocery 500.00"]),
        )))),
    ];

    let output =
        process_document_with_strategies(&pdf, OutputKind::DelimitedText, strategies).unwrap();
    assert_eq!(output.summary.transaction_count, 1);
    assert_eq!(output.table.records()[0].description, "Grocery");
}

#[test]
fn flate_compressed_scan_is_decoded_for_ocr() {
    let pdf = build_scanned_pdf(8, 8, true);

    let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
        Box::new(TextLayerStrategy),
        Box::new(OcrStrategy::with_engine(OcrEngine::with_recognizer(Box::new(
            ScriptedRecognizer(vec!["02/01/2024 Fuel 75.25"]),
        )))),
    ];

    let output =
        process_document_with_strategies(&pdf, OutputKind::DelimitedText, strategies).unwrap();
    assert_eq!(output.summary.transaction_count, 1);
    assert_eq!(output.table.records()[0].description, "Fuel");
}

#[test]
fn scanned_document_with_failing_ocr_is_no_table_found() {
    let pdf = build_scanned_pdf(8, 8, false);

    let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
        Box::new(TextLayerStrategy),
        Box::new(OcrStrategy::with_engine(OcrEngine::with_recognizer(Box::new(
            ScriptedRecognizer(vec![]),
        )))),
    ];

    let err = process_document_with_strategies(&pdf, OutputKind::DelimitedText, strategies)
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoTableFound));
}
