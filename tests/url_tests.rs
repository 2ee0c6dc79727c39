// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use sitekit::browser::UrlPattern;
use sitekit::error::Error;

const BASE: &str = "https://bank.example/area/";

#[test]
fn relative_patterns_match_under_the_base() {
    let p = UrlPattern::one(r"accounts/(?P<id>\w+)/history");
    let params = p
        .matches("https://bank.example/area/accounts/A12/history?page=2", Some(BASE))
        .unwrap()
        .unwrap();
    assert_eq!(params.get("id").map(String::as_str), Some("A12"));

    assert!(p
        .matches("https://other.example/area/accounts/A12/history", Some(BASE))
        .unwrap()
        .is_none());
    // anchored at the start only
    assert!(p
        .matches("https://bank.example/area/x/accounts/A12/history", Some(BASE))
        .unwrap()
        .is_none());
}

#[test]
fn rooted_and_absolute_patterns_ignore_the_base_path() {
    let rooted = UrlPattern::one("/login");
    assert!(rooted.matches("https://bank.example/login", Some(BASE)).unwrap().is_some());
    assert!(rooted.matches("https://bank.example/area/login", Some(BASE)).unwrap().is_none());

    let absolute = UrlPattern::one(r"https://auth\.example/sso");
    assert!(absolute.matches("https://auth.example/sso?next=1", None).unwrap().is_some());
}

#[test]
fn build_substitutes_named_groups() {
    let p = UrlPattern::new([r"accounts/?$", r"accounts/(?P<id>\w+)/history"]);
    assert_eq!(
        p.build(Some(BASE), &[("id", "A12")]).unwrap(),
        "https://bank.example/area/accounts/A12/history"
    );
    assert_eq!(
        UrlPattern::one(r"shipmentTracking\?AWB=(?P<id>\w+)")
            .build(Some("https://track.example"), &[("id", "123")])
            .unwrap(),
        "https://track.example/shipmentTracking?AWB=123"
    );
}

#[test]
fn build_needs_exactly_the_pattern_parameters() {
    let p = UrlPattern::one(r"accounts/(?P<id>\w+)/history");
    for params in [&[][..], &[("id", "1"), ("page", "2")][..], &[("page", "2")][..]] {
        let err = p.build(Some(BASE), params).unwrap_err();
        assert!(matches!(err, Error::UrlNotResolvable(_)), "{:?}", err);
    }
}

#[test]
fn build_skips_patterns_that_are_not_literals() {
    let p = UrlPattern::one(r"accounts/\d+");
    assert!(matches!(p.build(Some(BASE), &[]), Err(Error::UrlNotResolvable(_))));
}

#[test]
fn relative_pattern_without_base_is_not_resolvable() {
    let p = UrlPattern::one("login");
    assert!(matches!(p.matches("https://x.example/login", None), Err(Error::UrlNotResolvable(_))));
}
