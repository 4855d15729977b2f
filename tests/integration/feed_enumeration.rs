//! Feed enumeration tests over real export files

use std::path::PathBuf;

use receipt_downloader::source::{CsvUrlSource, XmlUrlSource};

fn write_feed(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_csv_export_row_yields_two_references_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_feed(
        &dir,
        "orders.csv",
        "Id;Receipt;VehicleRegistrationCertificate\n1;https://h/a;https://h/b\n",
    );

    let urls: Vec<String> = CsvUrlSource::open(&path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(urls, vec!["https://h/a", "https://h/b"]);
}

#[test]
fn test_csv_custom_separator_and_columns() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_feed(
        &dir,
        "orders.csv",
        "Id,Document\n1,https://h/doc-1\n2,https://h/doc-2\n",
    );

    let urls: Vec<String> = CsvUrlSource::open_with(&path, b',', &["Document"])
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(urls, vec!["https://h/doc-1", "https://h/doc-2"]);
}

#[test]
fn test_xml_export_yields_document_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write_feed(
        &dir,
        "export.xml",
        "<Export>\
           <Order>\
             <Id>1</Id>\
             <Receipt>https://h/invoices/1/receipt.pdf</Receipt>\
             <VehicleRegistrationCertificate>https://h/certs/1.pdf</VehicleRegistrationCertificate>\
           </Order>\
           <Order>\
             <Id>2</Id>\
             <Receipt>https://h/invoices/2/receipt.pdf</Receipt>\
           </Order>\
         </Export>",
    );

    let urls: Vec<String> = XmlUrlSource::open(&path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://h/invoices/1/receipt.pdf",
            "https://h/certs/1.pdf",
            "https://h/invoices/2/receipt.pdf",
        ]
    );
}

#[test]
fn test_xml_feed_is_not_buffered_up_front() {
    // Enumeration is lazy: the first URL is available before the rest of the
    // document has been consumed.
    let dir = tempfile::TempDir::new().unwrap();
    let mut body = String::from("<Export><Receipt>https://h/first</Receipt>");
    for i in 0..1000 {
        body.push_str(&format!("<Receipt>https://h/{i}</Receipt>"));
    }
    body.push_str("</Export>");
    let path = write_feed(&dir, "export.xml", &body);

    let mut source = XmlUrlSource::open(&path).unwrap();
    assert_eq!(source.next().unwrap().unwrap(), "https://h/first");
}
