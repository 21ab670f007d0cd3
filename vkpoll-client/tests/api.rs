use std::future::Future;
use std::sync::{Arc, Mutex};

use vkpoll_client::{ApiError, Client, Config, InvocationError, Transport, TransportError};

/// Answers every request with one fixed body and records the last query.
#[derive(Clone)]
struct Fixed {
    body: &'static str,
    last: Arc<Mutex<Option<(String, Vec<(String, String)>)>>>,
}

impl Fixed {
    fn new(body: &'static str) -> Self {
        Self { body, last: Arc::default() }
    }

    fn param(&self, name: &str) -> Option<String> {
        let last = self.last.lock().unwrap();
        let (_, query) = last.as_ref()?;
        query.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    fn url(&self) -> String {
        self.last.lock().unwrap().as_ref().map(|(u, _)| u.clone()).unwrap_or_default()
    }
}

impl Transport for Fixed {
    fn get(
        &self,
        url:   &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        *self.last.lock().unwrap() = Some((
            url.to_string(),
            query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
        let body = self.body.to_string();
        async move { Ok(body) }
    }
}

fn client(t: &Fixed) -> Client<Fixed> {
    let config = Config { access_token: "tok".into(), ..Default::default() };
    Client::with_transport(config, t.clone())
}

#[tokio::test]
async fn send_message_query() {
    let t = Fixed::new(r#"{"response": 321}"#);
    let id = client(&t).send_message(555, "привет", &["photo1_2", "doc3_4"]).await.unwrap();

    assert_eq!(id, 321);
    assert_eq!(t.url(), "https://api.vk.com/method/messages.send");
    assert_eq!(t.param("access_token").as_deref(), Some("tok"));
    assert_eq!(t.param("v").as_deref(), Some("5.63"));
    assert_eq!(t.param("peer_id").as_deref(), Some("555"));
    assert_eq!(t.param("message").as_deref(), Some("привет"));
    assert_eq!(t.param("attachment").as_deref(), Some("photo1_2,doc3_4"));
    assert!(t.param("random_id").is_some());
}

#[tokio::test]
async fn send_message_without_attachments() {
    let t = Fixed::new(r#"{"response": 1}"#);
    client(&t).send_message(1, "x", &[]).await.unwrap();
    assert_eq!(t.param("attachment"), None);
}

#[tokio::test]
async fn api_error_surfaces() {
    let t = Fixed::new(r#"{"error": {"error_code": 6, "error_msg": "Too many requests per second"}}"#);
    let err = client(&t).send_message(1, "x", &[]).await.unwrap_err();
    match err {
        InvocationError::Api(e @ ApiError { code: 6, .. }) => assert!(e.is_rate_limited()),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn acquire_session_reads_triple() {
    let t = Fixed::new(r#"{"response": {"key": "k", "server": "im.vk.com/nim9", "ts": 1870000000}}"#);
    let session = client(&t).acquire_session().await.unwrap();

    assert_eq!(t.url(), "https://api.vk.com/method/messages.getLongPollServer");
    assert_eq!(t.param("lp_version").as_deref(), Some("2"));
    assert_eq!(session.cursor(), 1_870_000_000);
    assert_eq!(session.endpoint(), "im.vk.com/nim9");
    assert_eq!(session.key(), "k");
}
