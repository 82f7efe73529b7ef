pub mod u601_import_csv;
