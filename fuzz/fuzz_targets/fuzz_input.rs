// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use orderly::allocator::sequenced_name;
use orderly::analysis::{split_sentences, KeywordSummarizer};
use orderly::classify::{type_tag, TypeClassifier};
use orderly::owner::OwnerResolver;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    filename: &'a str,
    text: &'a str,
    sequence: u32,
}

fuzz_target!(|input: Input<'_>| {
    let classifier = TypeClassifier::default();
    let _ = classifier.bucket_for(input.filename);
    let _ = type_tag(input.filename);

    let owner = OwnerResolver::default().resolve(input.filename);
    assert!(!owner.is_empty());
    assert!(!owner.contains('/'));

    let _ = sequenced_name(input.filename, input.sequence);

    let summarizer = KeywordSummarizer::default();
    let first = summarizer.analyze(input.text);
    assert_eq!(first, summarizer.analyze(input.text));
    let _ = split_sentences(input.text);
});
