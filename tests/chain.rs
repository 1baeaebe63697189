use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use obi::dispatcher::default_dispatcher;
use obi::middleware::{self, BoxedConstructor, Chain};
use obi::{BoxError, BoxedHandler, Handler, Request, Response};

/// Shared output that every layer writes into, in the order it runs.
type Writer = Arc<Mutex<String>>;

/// Writes its tag, then delegates. Useful to check the order layers run in.
fn tag(tag: &'static str, out: &Writer) -> BoxedConstructor {
    let out = Arc::clone(out);
    middleware::infallible(move |next: BoxedHandler| {
        let out = Arc::clone(&out);
        (move |req: Request| {
            let next = Arc::clone(&next);
            let out = Arc::clone(&out);
            async move {
                out.lock().unwrap().push_str(tag);
                next.call(req).await
            }
        })
        .into_boxed_handler()
    })
}

fn app(out: &Writer) -> BoxedHandler {
    let out = Arc::clone(out);
    (move |_req: Request| {
        let out = Arc::clone(&out);
        async move {
            out.lock().unwrap().push_str("app\n");
            Response::text("app")
        }
    })
    .into_boxed_handler()
}

async fn serve(handler: &BoxedHandler) -> Response {
    handler.call(Request::default()).await
}

#[tokio::test]
async fn then_orders_handlers_correctly() {
    let out = Writer::default();
    let chain = Chain::new([tag("t1\n", &out), tag("t2\n", &out), tag("t3\n", &out)]);

    let handler = chain.then(Some(app(&out))).unwrap();
    serve(&handler).await;

    assert_eq!(*out.lock().unwrap(), "t1\nt2\nt3\napp\n");
}

#[tokio::test]
async fn then_is_repeatable() {
    let out = Writer::default();
    let chain = Chain::new([tag("a\n", &out), tag("b\n", &out)]);

    let first = chain.then(Some(app(&out))).unwrap();
    let second = chain.then(Some(app(&out))).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    serve(&first).await;
    serve(&second).await;
    assert_eq!(*out.lock().unwrap(), "a\nb\napp\na\nb\napp\n");
}

#[test]
fn then_works_with_no_middleware() {
    let out = Writer::default();
    let terminal = app(&out);

    let handler = Chain::default().then(Some(Arc::clone(&terminal))).unwrap();
    assert!(Arc::ptr_eq(&handler, &terminal));
}

#[test]
fn then_treats_none_as_default_dispatcher() {
    let handler = Chain::default().then(None).unwrap();
    assert!(Arc::ptr_eq(&handler, &default_dispatcher()));
}

#[test]
fn then_fn_treats_none_as_default_dispatcher() {
    let handler = Chain::default()
        .then_fn(None::<fn(Request) -> std::future::Ready<Response>>)
        .unwrap();
    assert!(Arc::ptr_eq(&handler, &default_dispatcher()));
}

#[tokio::test]
async fn none_is_wrapped_when_chain_is_not_empty() {
    let out = Writer::default();
    let handler = Chain::new([tag("t1\n", &out)]).then(None).unwrap();
    assert!(!Arc::ptr_eq(&handler, &default_dispatcher()));

    let res = serve(&handler).await;
    assert_eq!(*out.lock().unwrap(), "t1\n");
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), b"404 page not found\n");
}

#[tokio::test]
async fn then_fn_none_is_wrapped_when_chain_is_not_empty() {
    let out = Writer::default();
    let handler = Chain::new([tag("t1\n", &out)])
        .then_fn(None::<fn(Request) -> std::future::Ready<Response>>)
        .unwrap();
    assert!(!Arc::ptr_eq(&handler, &default_dispatcher()));

    let res = serve(&handler).await;
    assert_eq!(*out.lock().unwrap(), "t1\n");
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), b"404 page not found\n");
}

#[tokio::test]
async fn then_fn_constructs_handler() {
    async fn created(_req: Request) -> StatusCode {
        StatusCode::CREATED
    }

    let handler = Chain::default().then_fn(Some(created)).unwrap();
    let res = serve(&handler).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn append_adds_handlers_correctly() {
    let out = Writer::default();
    let chain = Chain::new([tag("t1\n", &out), tag("t2\n", &out)]);
    let derived = chain.append([tag("t3\n", &out), tag("t4\n", &out)]);

    assert_eq!(chain.len(), 2);
    assert_eq!(derived.len(), 4);

    let handler = derived.then(Some(app(&out))).unwrap();
    serve(&handler).await;
    assert_eq!(*out.lock().unwrap(), "t1\nt2\nt3\nt4\napp\n");
}

#[tokio::test]
async fn append_leaves_original_usable() {
    let out = Writer::default();
    let chain = Chain::new([tag("t1\n", &out)]);
    let _derived = chain.append([tag("t2\n", &out)]);

    let handler = chain.then(Some(app(&out))).unwrap();
    serve(&handler).await;
    assert_eq!(*out.lock().unwrap(), "t1\napp\n");
}

#[tokio::test]
async fn extend_adds_handlers_correctly() {
    let out = Writer::default();
    let chain1 = Chain::new([tag("t1\n", &out), tag("t2\n", &out)]);
    let chain2 = Chain::new([tag("t3\n", &out), tag("t4\n", &out)]);
    let derived = chain1.extend(&chain2);

    assert_eq!(chain1.len(), 2);
    assert_eq!(chain2.len(), 2);
    assert_eq!(derived.len(), 4);

    let handler = derived.then(Some(app(&out))).unwrap();
    serve(&handler).await;
    assert_eq!(*out.lock().unwrap(), "t1\nt2\nt3\nt4\napp\n");
}

#[derive(Debug)]
struct MissingSecret;

impl fmt::Display for MissingSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("signing secret not configured")
    }
}

impl std::error::Error for MissingSecret {}

fn counting(calls: &Arc<AtomicUsize>) -> BoxedConstructor {
    let calls = Arc::clone(calls);
    middleware::infallible(move |next| {
        calls.fetch_add(1, Ordering::SeqCst);
        next
    })
}

#[test]
fn failing_constructor_aborts_materialization() {
    let outer = Arc::new(AtomicUsize::new(0));
    let inner = Arc::new(AtomicUsize::new(0));
    let failing = middleware::constructor(|_next: BoxedHandler| -> Result<BoxedHandler, BoxError> {
        Err(Box::new(MissingSecret))
    });

    let chain = Chain::new([counting(&outer), failing, counting(&inner)]);
    let err = chain.then(None).err().expect("chain should not build");

    assert_eq!(err.index(), 1);
    assert_eq!(err.to_string(), "middleware #1: signing secret not configured");
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.into_source().downcast_ref::<MissingSecret>().is_some());

    // Built last to first: the inner layer ran, the outer one never did.
    assert_eq!(inner.load(Ordering::SeqCst), 1);
    assert_eq!(outer.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_constructor_never_reaches_terminal() {
    let out = Writer::default();
    let failing = middleware::constructor(|_next: BoxedHandler| Err::<BoxedHandler, _>("nope"));

    let result = Chain::new([tag("t1\n", &out), failing]).then(Some(app(&out)));

    assert!(result.is_err());
    assert!(out.lock().unwrap().is_empty());
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn constructor_failure_is_left_to_the_caller_to_report() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();

    let failing = middleware::constructor(|_next: BoxedHandler| Err::<BoxedHandler, _>("nope"));
    let result = tracing::subscriber::with_default(subscriber, || Chain::new([failing]).then(None));

    assert!(result.is_err());
    assert!(captured.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn constructor_may_short_circuit() {
    let deny = middleware::infallible(|_next| {
        (|_req: Request| async { StatusCode::FORBIDDEN }).into_boxed_handler()
    });
    let out = Writer::default();

    let handler = Chain::new([deny]).then(Some(app(&out))).unwrap();
    let res = serve(&handler).await;

    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert!(out.lock().unwrap().is_empty());
}

#[derive(Clone, Debug)]
struct UserId(u64);

#[tokio::test]
async fn outer_layer_hands_values_to_inner_handler() {
    let authenticate = middleware::infallible(|next: BoxedHandler| {
        (move |mut req: Request| {
            let next = Arc::clone(&next);
            req.extensions_mut().insert(UserId(7));
            async move { next.call(req).await }
        })
        .into_boxed_handler()
    });
    let whoami = |req: Request| async move {
        match req.extensions().get::<UserId>() {
            Some(UserId(id)) => format!("user {id} at {}", req.uri()),
            None => "anonymous".to_owned(),
        }
    };

    let handler = Chain::new([authenticate]).then_fn(Some(whoami)).unwrap();
    let req: Request = http::Request::get("/me?full=1")
        .body(bytes::Bytes::new())
        .unwrap()
        .into();
    let res = handler.call(req).await;

    assert_eq!(res.body(), b"user 7 at /me?full=1");
}

#[tokio::test]
async fn chain_is_shareable_across_tasks() {
    let out = Writer::default();
    let chain = Arc::new(Chain::new([tag("t\n", &out)]));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let chain = Arc::clone(&chain);
        let out = Arc::clone(&out);
        tasks.spawn(async move {
            let handler = chain.append([]).then(Some(app(&out))).unwrap();
            serve(&handler).await;
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    assert_eq!(chain.len(), 1);
    let out = out.lock().unwrap();
    assert_eq!(out.matches("t\n").count(), 8);
    assert_eq!(out.matches("app\n").count(), 8);
}
