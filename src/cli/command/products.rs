//! Describes every product the downloader knows about.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::product::Product;

pub fn products(today: NaiveDate) -> String {
    let mut out = String::new();

    for product in Product::ALL {
        let info = product.info();
        let (start, end) = info.coverage(today);

        // Writing to a String cannot fail
        let _ = writeln!(out, "{}", info.name);
        let _ = writeln!(out, "  service:   {}", info.service_id);
        let _ = writeln!(out, "  coverage:  {} to {}", start, end);
        for dataset in info.datasets {
            let _ = writeln!(
                out,
                "  dataset:   {} ({})",
                dataset.id,
                dataset.variables.join(", ")
            );
        }
        if let Some(monthly) = info.monthly_dataset {
            let _ = writeln!(out, "  monthly:   {}", monthly);
        }
        let _ = writeln!(out, "  defaults:  {}", info.default_variables.join(", "));
    }

    out
}

// -- Tests -------------------------------------------------------------------
