//! End-to-end catalog, search and stream resolution against a mock site

use std::sync::Arc;

use async_trait::async_trait;
use dizipal_core::{
    CatalogSection, ChallengeBypass, ClientConfig, DizipalError, DizipalScraper, MediaFormat,
    MediaKind, PageRequest, Result, ScraperConfig,
};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
<html><body>
<nav><ul><li><a href="/"><span class="title">Ana Sayfa</span></a></li></ul></nav>
<article class="type2">
  <ul>
    <li><a href="/dizi/kurulus-osman"><img src="/uploads/osman.jpg"><span class="title">Kuruluş Osman</span></a></li>
    <li><a href="/dizi/broken"><img src="/uploads/broken.jpg"></a></li>
    <li><a href="/film/ayla"><img data-src="//img.example.net/ayla.jpg"><span class="title">Ayla</span></a></li>
    <li><span class="title">Linkless</span></li>
    <li><a href="/dizi/yargi"><span class="title">Yargı</span></a></li>
  </ul>
</article>
</body></html>
"#;

fn scraper_for(server: &MockServer) -> DizipalScraper {
    DizipalScraper::with_config(config_for(server)).unwrap()
}

fn config_for(server: &MockServer) -> ScraperConfig {
    ScraperConfig {
        client: ClientConfig {
            base_url: server.uri(),
            requests_per_second: 0.0,
            ..ClientConfig::default()
        },
        ..ScraperConfig::default()
    }
}

#[tokio::test]
async fn catalog_page_keeps_document_order_and_drops_bad_tiles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/diziler"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let page = scraper.get_catalog_page("diziler", 1).await.unwrap();

    assert_eq!(page.section, "Yeni Diziler");
    assert!(!page.has_next);

    let titles: Vec<&str> = page.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Kuruluş Osman", "Ayla", "Yargı"]);

    let osman = &page.entries[0];
    assert_eq!(osman.detail_url, format!("{}/dizi/kurulus-osman", server.uri()));
    assert_eq!(osman.poster_url, Some(format!("{}/uploads/osman.jpg", server.uri())));
    assert_eq!(osman.media_kind, MediaKind::Series);

    let ayla = &page.entries[1];
    assert_eq!(ayla.poster_url, Some("http://img.example.net/ayla.jpg".to_string()));
    assert_eq!(ayla.media_kind, MediaKind::Movie);
}

#[tokio::test]
async fn custom_sections_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tur/belgesel"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let config = ScraperConfig {
        sections: vec![CatalogSection::new("belgesel", "Belgesel", "/tur/belgesel")],
        ..config_for(&server)
    };
    let scraper = DizipalScraper::with_config(config).unwrap();

    let page = scraper.get_catalog_page("belgesel", 1).await.unwrap();
    assert_eq!(page.entries.len(), 3);
    assert!(matches!(
        scraper.get_catalog_page("diziler", 1).await,
        Err(DizipalError::UnknownSection(_))
    ));
}

struct StaticBypass(&'static str);

#[async_trait]
impl ChallengeBypass for StaticBypass {
    fn name(&self) -> &str {
        "static"
    }

    async fn solve(&self, _request: &PageRequest) -> Result<String> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn challenged_listing_is_scraped_from_bypass_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/koleksiyon/netflix"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("<title>Just a moment...</title>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let scraper =
        DizipalScraper::with_bypass(config_for(&server), Arc::new(StaticBypass(LISTING))).unwrap();

    let page = scraper.get_catalog_page("netflix", 1).await.unwrap();
    assert_eq!(page.entries.len(), 3);
}

#[tokio::test]
async fn challenged_listing_without_bypass_fails_whole_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/filmler"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Just a moment..."))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    assert!(matches!(
        scraper.get_catalog_page("filmler", 1).await,
        Err(DizipalError::BypassFailed(_))
    ));
}

#[tokio::test]
async fn search_posts_form_and_decodes_keyed_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search-autocomplete"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .and(body_string("query=kara+para"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "3051": {"title": "Kara Para Aşk", "url": "/dizi/kara-para-ask", "poster": "/uploads/kpa.jpg", "type": "series"},
                "77": {"title": "", "url": "/dizi/blank"},
                "912": {"title": "Kara Film", "url": "/film/kara-film"}
            }"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let results = scraper.search("  kara para ").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Kara Para Aşk");
    assert_eq!(results[0].detail_url, format!("{}/dizi/kara-para-ask", server.uri()));
    assert_eq!(results[0].media_kind, MediaKind::Series);
    assert_eq!(results[1].media_kind, MediaKind::Movie);
}

#[tokio::test]
async fn search_with_unexpected_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search-autocomplete"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    match scraper.search("dark").await {
        Err(e @ DizipalError::MalformedResponse(_)) => assert!(e.is_no_results()),
        other => panic!("Expected MalformedResponse, got {:?}", other),
    }
}

const PRIMARY_PAGE: &str = r#"
<script>
var playerConfig = {
    "tracks": [
        {"kind":"captions","file":"https:\/\/rapidvid.example\/subs\/tr.vtt","label":"T\u00fcrk\u00e7e"},
        {"kind":"captions","file":"https:\/\/rapidvid.example\/subs\/tr.vtt","label":"Kopya"},
        {"kind":"captions","file":"\/subs\/en.vtt","label":"\u0130ngilizce"}
    ],
    "sources": [{"file": "\x68\x74\x74\x70\x73\x3a\x2f\x2f\x61\x2e\x6d\x33\x75\x38", "type": "hls"}]
};
</script>
"#;

#[tokio::test]
async fn resolve_stream_with_primary_strategy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod/v1a2b3"))
        .and(header("referer", "https://dizipal953.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRIMARY_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let page_url = format!("{}/vod/v1a2b3", server.uri());
    let resolved = scraper
        .resolve_stream(&page_url, Some("https://dizipal953.com/"))
        .await
        .unwrap();

    assert_eq!(resolved.stream.source_url, "https://a.m3u8");
    assert_eq!(resolved.stream.media_format, MediaFormat::Hls);
    assert_eq!(
        resolved.stream.required_headers.get("Referer").map(String::as_str),
        Some("https://dizipal953.com/")
    );

    assert_eq!(resolved.subtitles.len(), 2);
    assert_eq!(resolved.subtitles[0].language_label, "Türkçe");
    assert_eq!(resolved.subtitles[0].url, "https://rapidvid.example/subs/tr.vtt");
    assert_eq!(resolved.subtitles[1].language_label, "İngilizce");
    assert_eq!(resolved.subtitles[1].url, format!("{}/subs/en.vtt", server.uri()));
}

#[tokio::test]
async fn resolve_stream_with_fallback_strategy_and_default_referer() {
    let server = MockServer::start().await;
    let origin = format!("{}/", server.uri());
    Mock::given(method("GET"))
        .and(path("/vod/fallback"))
        .and(header("referer", origin.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"jwplayer().setup({"sources":[{"file":"av('\\x68747470733a2f2f622e6d3375 38')","label":"Auto"}]});"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let resolved = scraper
        .resolve_stream(&format!("{}/vod/fallback", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(resolved.stream.source_url, "https://b.m3u8");
    assert!(resolved.subtitles.is_empty());
    assert_eq!(
        resolved.stream.required_headers.get("Referer"),
        Some(&origin)
    );
}

#[tokio::test]
async fn resolve_stream_fails_on_undecodable_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"kind":"captions","file":"https:\/\/r.example\/a.vtt","label":"A"} "file":"av('68747470733a2f2f622e6d33753')","label""#,
        ))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    match scraper
        .resolve_stream(&format!("{}/vod/broken", server.uri()), None)
        .await
    {
        Err(DizipalError::StreamNotFound(msg)) => assert!(msg.contains("av-hex")),
        other => panic!("Expected StreamNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn resolve_stream_fetches_player_page_live_every_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod/again"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRIMARY_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let page_url = format!("{}/vod/again", server.uri());

    for _ in 0..2 {
        let resolved = scraper.resolve_stream(&page_url, None).await.unwrap();
        assert_eq!(resolved.stream.source_url, "https://a.m3u8");
    }
    assert!(scraper.client().cache().is_empty());
}

#[tokio::test]
async fn concurrent_resolves_do_not_interfere() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vod/one"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRIMARY_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vod/two"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#""file":"av('68747470733a2f2f622e6d337538')","label""#,
        ))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let one_url = format!("{}/vod/one", server.uri());
    let two_url = format!("{}/vod/two", server.uri());

    let (one, two) = tokio::join!(
        scraper.resolve_stream(&one_url, None),
        scraper.resolve_stream(&two_url, None),
    );

    assert_eq!(one.unwrap().stream.source_url, "https://a.m3u8");
    assert_eq!(two.unwrap().stream.source_url, "https://b.m3u8");
}
