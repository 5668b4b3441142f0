//! Response body that stops streaming when its request is cancelled.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::error::{BoxError, GatewayError};

pin_project! {
    /// Wraps an upstream body; yields an error and ends once `token` fires.
    pub struct CancellableBody<B> {
        #[pin]
        inner: B,
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        finished: bool,
    }
}

impl<B> CancellableBody<B> {
    pub fn new(inner: B, token: CancellationToken) -> Self {
        Self {
            inner,
            cancelled: token.cancelled_owned(),
            finished: false,
        }
    }
}

impl<B> Body for CancellableBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        if this.cancelled.poll(cx).is_ready() {
            *this.finished = true;
            return Poll::Ready(Some(Err(GatewayError::Cancelled.into())));
        }

        this.inner.poll_frame(cx).map_err(Into::into)
    }

    fn is_end_stream(&self) -> bool {
        self.finished || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full, StreamBody};

    #[tokio::test]
    async fn test_passes_frames_through() {
        let body = CancellableBody::new(
            Full::new(Bytes::from_static(b"hello")),
            CancellationToken::new(),
        );
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Frame<Bytes>, BoxError>>(4);
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let token = CancellationToken::new();
        let mut body = Box::pin(CancellableBody::new(StreamBody::new(stream), token.clone()));

        tx.send(Ok(Frame::data(Bytes::from_static(b"first"))))
            .await
            .unwrap();
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"first"));

        token.cancel();
        let err = body.frame().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(body.frame().await.is_none());
    }
}
