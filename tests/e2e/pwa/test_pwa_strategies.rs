//! E2E Test: PWA Caching Strategies
//!
//! Tests how each request class is served across repeated fetches:
//! 1. Cold-cache requests are stored exactly once
//! 2. Cached responses round-trip unchanged without the network
//! 3. Styles, scripts and fonts are served stale and refreshed in the background
//! 4. Pinned shell URLs never hit the network after install

use sw_e2e_tests::*;
use sw_runtime::service_worker::{
    ApiReadPolicy, FetchSource, Request, RequestDestination, RequestKey, Response, Strategy,
    WorkerConfig,
};

#[tokio::test]
async fn test_cold_cache_stores_single_entry() {
    let network = origin();
    network.route(url("/data/members.txt"), Response::ok_with("members"));
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::new(url("/data/members.txt"));

    let first = sw.fetch(&request).await;
    assert_eq!(first.source, FetchSource::Network);
    let second = sw.fetch(&request).await;
    assert_eq!(second.source, FetchSource::Cache);
    sw.wait_until_idle().await;

    let keys = sw.store().entry_keys("line-dynamic-v1").await.unwrap();
    assert_eq!(keys, vec![RequestKey::get(url("/data/members.txt"))]);
}

#[tokio::test]
async fn test_cached_image_round_trips_without_network() {
    let network = origin();
    let logo = Response::ok_with(vec![0x89, 0x50, 0x4e, 0x47])
        .with_header("Content-Type", "image/png")
        .with_header("Cache-Control", "max-age=60");
    network.route(url("/customer-192.png"), logo.clone());
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::new(url("/customer-192.png")).with_destination(RequestDestination::Image);

    sw.fetch(&request).await;
    network.set_online(false);
    let cached = sw.fetch(&request).await;

    assert_eq!(cached.source, FetchSource::Cache);
    assert_eq!(cached.response, logo);
    assert_eq!(network.fetch_count(&url("/customer-192.png")), 1);
}

#[tokio::test]
async fn test_missing_image_offline_is_unavailable() {
    let network = origin();
    let sw = active_worker(split_config("v1"), &network).await;
    network.set_online(false);

    let served = sw
        .fetch(&Request::new(url("/customer-512.png")).with_destination(RequestDestination::Image))
        .await;
    assert_eq!(served.source, FetchSource::Fallback);
    assert_eq!(served.response.status, 503);
    assert!(served.response.body.is_empty());
}

#[tokio::test]
async fn test_error_responses_are_not_cached() {
    let network = origin();
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::new(url("/missing.txt"));

    let served = sw.fetch(&request).await;
    assert_eq!(served.response.status, 404);
    assert_eq!(served.source, FetchSource::Network);
    assert!(sw
        .store()
        .entry_keys("line-dynamic-v1")
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_stylesheet_is_stale_while_revalidate() {
    let network = origin();
    network.route(url("/style.css"), Response::ok_with("v1"));
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::new(url("/style.css")).with_destination(RequestDestination::Style);
    assert_eq!(sw.route(&request).strategy, Strategy::StaleWhileRevalidate);

    // Cold cache waits for the network
    let first = sw.fetch(&request).await;
    assert_eq!(first.source, FetchSource::Network);
    assert_eq!(first.response.text(), Some("v1"));
    sw.wait_until_idle().await;

    network.route(url("/style.css"), Response::ok_with("v2"));
    let stale = sw.fetch(&request).await;
    assert_eq!(stale.source, FetchSource::Cache);
    assert_eq!(stale.response.text(), Some("v1"));

    sw.wait_until_idle().await;
    let fresh = sw.fetch(&request).await;
    assert_eq!(fresh.response.text(), Some("v2"));
}

#[tokio::test]
async fn test_font_offline_serves_cached_copy() {
    let network = origin();
    network.route(url("/fonts/app.woff2"), Response::ok_with("wOF2"));
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::new(url("/fonts/app.woff2")).with_destination(RequestDestination::Font);

    sw.fetch(&request).await;
    sw.wait_until_idle().await;
    network.set_online(false);

    let served = sw.fetch(&request).await;
    assert_eq!(served.source, FetchSource::Cache);
    assert_eq!(served.response.text(), Some("wOF2"));
    sw.wait_until_idle().await;
    assert_eq!(sw.pending_background(), 0);
}

#[tokio::test]
async fn test_navigation_is_network_first() {
    let network = origin();
    network.route(url("/members.html"), html("<h1>v1</h1>"));
    let sw = active_worker(split_config("v1"), &network).await;
    let request = Request::navigate(url("/members.html"));

    assert_eq!(sw.fetch(&request).await.source, FetchSource::Network);
    network.route(url("/members.html"), html("<h1>v2</h1>"));
    let served = sw.fetch(&request).await;
    assert_eq!(served.source, FetchSource::Network);
    assert_eq!(served.response.text(), Some("<h1>v2</h1>"));

    network.set_online(false);
    let offline = sw.fetch(&request).await;
    assert_eq!(offline.source, FetchSource::Cache);
    assert_eq!(offline.response.text(), Some("<h1>v2</h1>"));
}

#[tokio::test]
async fn test_navigation_finds_shell_entry_in_any_partition() {
    let network = origin();
    let sw = active_worker(split_config("v1"), &network).await;
    network.set_online(false);

    // Shell lives in line-static-v1, navigations use line-dynamic-v1
    let served = sw.fetch(&Request::navigate(url("/"))).await;
    assert_eq!(served.source, FetchSource::Cache);
    assert_eq!(served.response.text(), Some("<h1>root</h1>"));
}

#[tokio::test]
async fn test_pinned_shell_skips_network() {
    let network = social_origin();
    let sw = active_worker(WorkerConfig::social_app(ORIGIN, API), &network).await;
    assert_eq!(network.fetch_count(&url("/view.html")), 1);

    network.route(url("/view.html"), html("<h1>changed</h1>"));
    let served = sw.fetch(&Request::navigate(url("/view.html"))).await;
    assert_eq!(served.source, FetchSource::Cache);
    assert_eq!(served.response.text(), Some("<h1>view</h1>"));
    assert_eq!(network.fetch_count(&url("/view.html")), 1);

    // Other pages still go to the network
    network.route(url("/profile.html"), html("<h1>profile</h1>"));
    let other = sw.fetch(&Request::navigate(url("/profile.html"))).await;
    assert_eq!(other.source, FetchSource::Network);
}

#[tokio::test]
async fn test_cdn_host_is_pinned() {
    let network = social_origin();
    let sw = active_worker(WorkerConfig::social_app(ORIGIN, API), &network).await;
    assert_eq!(network.fetch_count(CDN), 1);

    // Precached root comes straight from the shell
    let root = sw.fetch(&Request::new(CDN).with_destination(RequestDestination::Style)).await;
    assert_eq!(root.source, FetchSource::Cache);
    assert_eq!(network.fetch_count(CDN), 1);

    // Any other path on the host is fetched once, then served from the shell
    let plugin = "https://cdn.tailwindcss.com/plugins/forms.js";
    network.route(plugin, Response::ok_with("forms"));
    let request = Request::new(plugin).with_destination(RequestDestination::Script);
    assert_eq!(sw.route(&request).strategy, Strategy::CacheFirst);
    assert_eq!(sw.fetch(&request).await.source, FetchSource::Network);

    network.set_online(false);
    let cached = sw.fetch(&request).await;
    assert_eq!(cached.source, FetchSource::Cache);
    assert_eq!(cached.response.text(), Some("forms"));
    let shell = sw.store().entry_keys("social-app-cache-v1").await.unwrap();
    assert!(shell.contains(&RequestKey::get(plugin)));
}

#[tokio::test]
async fn test_api_network_first_policy() {
    let network = origin();
    network.route(api("getUsers"), Response::ok_with(r#"{"users":[]}"#));
    let mut config = split_config("v1");
    config.api_reads = ApiReadPolicy::NetworkFirst;
    let sw = active_worker(config, &network).await;

    assert_eq!(sw.fetch(&Request::new(api("getUsers"))).await.source, FetchSource::Network);
    network.set_online(false);
    let cached = sw.fetch(&Request::new(api("getUsers"))).await;
    assert_eq!(cached.source, FetchSource::Cache);

    // Network-first API reads never fall through to the offline page
    let missing = sw.fetch(&Request::new(api("getComments"))).await;
    assert_eq!(missing.source, FetchSource::Fallback);
    assert_eq!(json(&missing.response)["status"], "offline");
}
