use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const INDEX_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {prefix}: {pos}/{len} ({per_sec}, {msg}) {eta}";

/// Add a bar tracking rows written for one index
pub fn index_bar(mp: &MultiProgress, index: &str, total: u64) -> ProgressBar {
    let pb = mp.add(ProgressBar::new(total));
    let style = ProgressStyle::default_bar()
        .template(INDEX_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_prefix(index.to_string());
    pb.set_message("exporting");
    pb
}
