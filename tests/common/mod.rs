#![allow(dead_code)]

use polars::prelude::*;
use reviewlens::source::{parse_delimited, OpenOptions};
use reviewlens::{cleaning, schema, ReviewTable};
use std::path::{Path, PathBuf};

/// Ten reviews of three products, with the column names a marketplace
/// export uses rather than the canonical ones.
///
/// Ratings in row order: 5, 5, 4, 3, 3, 2, 1, 5, 4, 4.
pub const SAMPLE_CSV: &str = "\
reviewer_name,product_title,review_text,rating,rating_count,category,discounted_price,actual_price,discount_percentage
ann,Wayona Nylon Braided USB,Great cable 👍 works fine,5,\"24,269\",Computers&Accessories|Cables,₹399,\"₹1,099\",64%
bob,Wayona Nylon Braided USB,Love it 👍👍,5,\"24,269\",Computers&Accessories|Cables,₹399,\"₹1,099\",64%
cat,Wayona Nylon Braided USB,Good value,4,\"24,269\",Computers&Accessories|Cables,₹399,\"₹1,099\",64%
ann,Wayona Nylon Braided USB,Okay I guess,3,\"24,269\",Computers&Accessories|Cables,₹399,\"₹1,099\",64%
bob,boAt Rockerz 450 Headphones,Average sound,3,120,Electronics|Headphones,\"₹1,499\",\"₹3,990\",62%
dan,boAt Rockerz 450 Headphones,Stopped working 😞,2,120,Electronics|Headphones,\"₹1,499\",\"₹3,990\",62%
ann,boAt Rockerz 450 Headphones,Broke in a week,1,120,Electronics|Headphones,\"₹1,499\",\"₹3,990\",62%
cat,Ambrane Unbreakable 60W,Fast charging 🔥,5,7,Computers&Accessories|Cables,₹199,₹349,43%
bob,Ambrane Unbreakable 60W,Solid build,4,7,Computers&Accessories|Cables,₹199,₹349,43%
eve,Ambrane Unbreakable 60W,Does the job,4,7,Computers&Accessories|Cables,₹199,₹349,43%
";

/// Parse CSV text the way the loader does: every column as text.
pub fn raw_frame(csv: &str) -> DataFrame {
    parse_delimited(csv.as_bytes().to_vec(), b',', &OpenOptions::new()).unwrap()
}

/// Normalize and clean a raw frame.
pub fn cleaned(df: DataFrame) -> ReviewTable {
    cleaning::clean(schema::normalize(df).unwrap()).unwrap()
}

pub fn sample_table() -> ReviewTable {
    cleaned(raw_frame(SAMPLE_CSV))
}

/// A cleaned table where product `pNN` has `NN + 1` reviews.
pub fn many_products_table(products: usize) -> ReviewTable {
    let mut names = Vec::new();
    let mut ratings = Vec::new();
    for i in 0..products {
        for j in 0..=i {
            names.push(format!("p{:02}", i));
            ratings.push(if j % 2 == 0 { "5" } else { "2" });
        }
    }
    let df = df!(
        "product_name" => names,
        "rating" => ratings
    )
    .unwrap();
    cleaned(df)
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
