use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use url::Url;

use crate::compress::{
    ImageCompressor, IMAGE_CEILING, LINK_THUMB_CEILING, MINI_PROGRAM_THUMB_CEILING,
};
use crate::hub::{DispatchHub, VendorCallbackHandler};
use crate::observers::ObserverRegistry;
use crate::pending::Pending;
use crate::status::ResultStatus;
use crate::wechat::{
    MediaMessage, MediaObject, MiniProgramObject, SendCompletion, SendMessageRequest, WechatApi,
    WechatRequest, WechatResponse, WechatScene,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareMessage {
    Image {
        data: Vec<u8>,
    },
    Link {
        url: String,
        title: Option<String>,
        description: Option<String>,
        thumb: Option<Vec<u8>>,
    },
    MiniProgram {
        path: String,
        /// Original id of the mini-program, `gh_...`.
        user_name: String,
        title: Option<String>,
        description: Option<String>,
        thumb: Option<Vec<u8>>,
    },
}

impl ShareMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Link { .. } => "link",
            Self::MiniProgram { .. } => "mini_program",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePlatform {
    Wechat {
        scene: WechatScene,
        message: ShareMessage,
    },
}

pub type ShareStatus = ResultStatus;

pub trait ShareObserver: Send + Sync {
    fn on_share_complete(&self, status: &ShareStatus);
}

/// What is remembered about a share while it is in flight. Payload bytes are not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShareTarget {
    scene: WechatScene,
    kind: &'static str,
}

struct ShareState {
    pending: Pending<ShareTarget>,
    observers: ObserverRegistry<dyn ShareObserver>,
}

pub struct ShareManager {
    hub: Arc<DispatchHub>,
    wechat: Arc<dyn WechatApi>,
    compressor: Arc<dyn ImageCompressor>,
    state: Mutex<ShareState>,
    me: Weak<Self>,
}

impl ShareManager {
    pub fn new(
        hub: Arc<DispatchHub>,
        wechat: Arc<dyn WechatApi>,
        compressor: Arc<dyn ImageCompressor>,
    ) -> Arc<Self> {
        let manager = Arc::new_cyclic(|me| Self {
            hub: hub.clone(),
            wechat,
            compressor,
            state: Mutex::new(ShareState {
                pending: Pending::new(),
                observers: ObserverRegistry::new(),
            }),
            me: me.clone(),
        });
        let handler: Arc<dyn VendorCallbackHandler> = manager.clone();
        hub.add_handler(&handler);
        manager
    }

    pub fn add(&self, observer: &Arc<dyn ShareObserver>) -> bool {
        self.state().observers.add(observer)
    }

    pub fn remove(&self, observer: &Arc<dyn ShareObserver>) -> bool {
        self.state().observers.remove(observer)
    }

    pub fn is_sharing(&self) -> bool {
        self.state().pending.is_active()
    }

    pub fn share(&self, platform: SharePlatform) {
        let SharePlatform::Wechat { scene, message } = platform;
        let target = ShareTarget {
            scene,
            kind: message.kind(),
        };
        tracing::info!("share {} to wechat scene {}", target.kind, scene.raw());

        // Rejected shares never occupy the pending slot.
        let message = match self.build_message(message) {
            Ok(message) => message,
            Err(reason) => {
                tracing::warn!("share rejected: {reason}");
                self.notify(target, ResultStatus::unusual(reason));
                return;
            }
        };
        let replaced = self.state().pending.begin(target);
        if let Some(previous) = replaced {
            tracing::warn!("superseding in-flight {} share", previous.kind);
        }

        let request = SendMessageRequest {
            scene,
            text_only: false,
            message,
        };
        self.wechat
            .send(WechatRequest::SendMessage(request), self.send_completion());
    }

    fn build_message(&self, message: ShareMessage) -> Result<MediaMessage, &'static str> {
        match message {
            ShareMessage::Image { data } => {
                let data = if data.len() <= IMAGE_CEILING {
                    data
                } else {
                    self.compressor
                        .compress_under(&data, IMAGE_CEILING)
                        .map_err(|e| {
                            tracing::warn!("image of {} bytes unusable: {e}", data.len());
                            "resource invalid"
                        })?
                };
                Ok(MediaMessage {
                    title: String::new(),
                    description: String::new(),
                    thumb_data: None,
                    object: MediaObject::Image { data },
                })
            }
            ShareMessage::Link {
                url,
                title,
                description,
                thumb,
            } => {
                if url.is_empty() {
                    return Err("link must not be empty");
                }
                Ok(MediaMessage {
                    title: title.unwrap_or_default(),
                    description: description.unwrap_or_default(),
                    thumb_data: self.thumbnail(thumb, LINK_THUMB_CEILING),
                    object: MediaObject::Webpage { url },
                })
            }
            ShareMessage::MiniProgram {
                path,
                user_name,
                title,
                description,
                thumb,
            } => {
                if path.is_empty() {
                    return Err("path must not be empty");
                }
                if user_name.is_empty() {
                    return Err("username must not be empty");
                }
                let program = MiniProgramObject {
                    webpage_url: String::new(),
                    user_name,
                    path,
                    hd_image_data: self.thumbnail(thumb, MINI_PROGRAM_THUMB_CEILING),
                    with_share_ticket: true,
                    program_type: self.hub.mini_program_type(),
                };
                Ok(MediaMessage {
                    title: title.unwrap_or_else(|| " ".to_string()),
                    description: description.unwrap_or_else(|| " ".to_string()),
                    thumb_data: None,
                    object: MediaObject::MiniProgram(program),
                })
            }
        }
    }

    /// Recompress a thumbnail under `ceiling`, or drop it.
    fn thumbnail(&self, thumb: Option<Vec<u8>>, ceiling: usize) -> Option<Vec<u8>> {
        let thumb = thumb?;
        match self.compressor.compress_under(&thumb, ceiling) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::info!("sharing without thumbnail: {e}");
                None
            }
        }
    }

    fn send_completion(&self) -> SendCompletion {
        let me = self.me.clone();
        Box::new(move |sent| {
            if let Some(manager) = me.upgrade() {
                manager.finish(if sent {
                    ResultStatus::Success(None)
                } else {
                    ResultStatus::unusual("share failed")
                });
            }
        })
    }

    fn finish(&self, status: ShareStatus) {
        let Some(target) = self.state().pending.take() else {
            tracing::debug!("no share in flight, dropping {} result", status.kind());
            return;
        };
        self.notify(target, status);
    }

    fn notify(&self, target: ShareTarget, status: ShareStatus) {
        let observers = self.state().observers.live();
        tracing::info!(
            "{} share to scene {} finished: {}",
            target.kind,
            target.scene.raw(),
            status.kind()
        );
        for observer in observers {
            observer.on_share_complete(&status);
        }
    }

    fn state(&self) -> MutexGuard<'_, ShareState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VendorCallbackHandler for ShareManager {
    fn on_resp(&self, resp: &WechatResponse) {
        if let WechatResponse::SendMessage(resp) = resp {
            self.finish(ResultStatus::from_wechat(resp.err_code, || None));
        }
    }

    fn handle_open_url(&self, _url: &Url) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCompressor, FakeWechat, ShareCapture};
    use crate::hub::RegisterPlatform;
    use crate::wechat::{err_code, MiniProgramType, SendMessageResp};

    struct Fixture {
        wechat: Arc<FakeWechat>,
        compressor: Arc<FakeCompressor>,
        hub: Arc<DispatchHub>,
        manager: Arc<ShareManager>,
        capture: Arc<ShareCapture>,
    }

    fn fixture() -> Fixture {
        let wechat = Arc::new(FakeWechat::default());
        let compressor = Arc::new(FakeCompressor::default());
        let hub = Arc::new(DispatchHub::new(wechat.clone()));
        let manager = ShareManager::new(hub.clone(), wechat.clone(), compressor.clone());
        let capture = Arc::new(ShareCapture::default());
        let observer: Arc<dyn ShareObserver> = capture.clone();
        manager.add(&observer);
        Fixture {
            wechat,
            compressor,
            hub,
            manager,
            capture,
        }
    }

    fn share(f: &Fixture, message: ShareMessage) {
        f.manager.share(SharePlatform::Wechat {
            scene: WechatScene::Session,
            message,
        });
    }

    fn link(url: &str, thumb: Option<Vec<u8>>) -> ShareMessage {
        ShareMessage::Link {
            url: url.into(),
            title: Some("Title".into()),
            description: None,
            thumb,
        }
    }

    fn mini_program(path: &str, user_name: &str) -> ShareMessage {
        ShareMessage::MiniProgram {
            path: path.into(),
            user_name: user_name.into(),
            title: None,
            description: None,
            thumb: Some(vec![1; 10]),
        }
    }

    fn sent_message(f: &Fixture) -> SendMessageRequest {
        match &f.wechat.sent.lock().unwrap()[0] {
            WechatRequest::SendMessage(request) => request.clone(),
            other => panic!("expected send message, got {other:?}"),
        }
    }

    #[test]
    fn empty_link_is_rejected_without_vendor_call() {
        let f = fixture();

        share(&f, link("", None));

        assert!(f.wechat.sent.lock().unwrap().is_empty());
        assert_eq!(
            f.capture.statuses(),
            vec![ResultStatus::unusual("link must not be empty")]
        );
        assert!(!f.manager.is_sharing());
    }

    #[test]
    fn rejected_share_does_not_swallow_share_in_flight() {
        let f = fixture();

        share(&f, link("https://example.com/a", None));
        share(&f, link("", None));
        f.wechat.complete_send(true);

        assert_eq!(
            f.capture.statuses(),
            vec![
                ResultStatus::unusual("link must not be empty"),
                ResultStatus::Success(None),
            ]
        );
        assert_eq!(f.wechat.sent.lock().unwrap().len(), 1);
        assert!(!f.manager.is_sharing());
    }

    #[test]
    fn mini_program_requires_path_then_user_name() {
        let f = fixture();

        share(&f, mini_program("", ""));
        share(&f, mini_program("pages/index", ""));

        assert!(f.wechat.sent.lock().unwrap().is_empty());
        assert_eq!(
            f.capture.statuses(),
            vec![
                ResultStatus::unusual("path must not be empty"),
                ResultStatus::unusual("username must not be empty"),
            ]
        );
    }

    #[test]
    fn link_is_sent_with_defaults_and_thumbnail() {
        let f = fixture();

        share(&f, link("https://example.com/a", Some(vec![7; 64])));

        let request = sent_message(&f);
        assert_eq!(request.scene, WechatScene::Session);
        assert!(!request.text_only);
        assert_eq!(request.message.title, "Title");
        assert_eq!(request.message.description, "");
        assert!(request.message.thumb_data.is_some());
        assert_eq!(
            request.message.object,
            MediaObject::Webpage {
                url: "https://example.com/a".into()
            }
        );
        assert_eq!(*f.compressor.ceilings.lock().unwrap(), vec![LINK_THUMB_CEILING]);
    }

    #[test]
    fn failed_thumbnail_is_omitted() {
        let f = fixture();
        *f.compressor.fail.lock().unwrap() = true;

        share(&f, link("https://example.com/a", Some(vec![7; 64])));

        let request = sent_message(&f);
        assert_eq!(request.message.thumb_data, None);
        assert!(f.capture.statuses().is_empty());
    }

    #[test]
    fn mini_program_uses_registered_environment() {
        let f = fixture();
        f.hub.register_platforms(&[RegisterPlatform::Wechat {
            app_id: "wx1".into(),
            universal_link: "https://example.com/app/".into(),
            mini_program: MiniProgramType::Preview,
        }]);

        share(&f, mini_program("pages/index?id=1", "gh_abc"));

        let request = sent_message(&f);
        assert_eq!(request.message.title, " ");
        assert_eq!(request.message.thumb_data, None);
        let MediaObject::MiniProgram(program) = request.message.object else {
            panic!("expected mini program");
        };
        assert_eq!(program.path, "pages/index?id=1");
        assert_eq!(program.user_name, "gh_abc");
        assert_eq!(program.webpage_url, "");
        assert!(program.with_share_ticket);
        assert_eq!(program.program_type, MiniProgramType::Preview);
        assert!(program.hd_image_data.is_some());
        assert_eq!(
            *f.compressor.ceilings.lock().unwrap(),
            vec![MINI_PROGRAM_THUMB_CEILING]
        );
    }

    #[test]
    fn small_image_is_sent_untouched() {
        let f = fixture();

        share(&f, ShareMessage::Image { data: vec![3; 100] });

        let request = sent_message(&f);
        assert_eq!(request.message.object, MediaObject::Image { data: vec![3; 100] });
        assert!(f.compressor.ceilings.lock().unwrap().is_empty());
    }

    #[test]
    fn oversized_image_is_recompressed() {
        let f = fixture();

        share(&f, ShareMessage::Image { data: vec![0; IMAGE_CEILING + 1] });

        let request = sent_message(&f);
        assert_eq!(
            request.message.object,
            MediaObject::Image {
                data: FakeCompressor::OUTPUT.to_vec()
            }
        );
        assert_eq!(*f.compressor.ceilings.lock().unwrap(), vec![IMAGE_CEILING]);
    }

    #[test]
    fn incompressible_image_is_resource_invalid() {
        let f = fixture();
        *f.compressor.fail.lock().unwrap() = true;

        share(&f, ShareMessage::Image { data: vec![0; IMAGE_CEILING + 1] });

        assert!(f.wechat.sent.lock().unwrap().is_empty());
        assert_eq!(
            f.capture.statuses(),
            vec![ResultStatus::unusual("resource invalid")]
        );
    }

    #[test]
    fn send_completion_decides_result() {
        for (sent, expected) in [
            (true, ResultStatus::Success(None)),
            (false, ResultStatus::unusual("share failed")),
        ] {
            let f = fixture();
            *f.wechat.deliver.lock().unwrap() = Some(sent);

            share(&f, link("https://example.com/a", None));

            assert_eq!(f.capture.statuses(), vec![expected], "sent {sent}");
        }
    }

    #[test]
    fn response_after_completion_is_dropped() {
        let f = fixture();
        *f.wechat.deliver.lock().unwrap() = Some(true);
        share(&f, link("https://example.com/a", None));

        f.hub.on_resp(&WechatResponse::SendMessage(SendMessageResp {
            err_code: err_code::USER_CANCEL,
            lang: None,
            country: None,
        }));

        assert_eq!(f.capture.statuses(), vec![ResultStatus::Success(None)]);
    }

    #[test]
    fn response_before_completion_wins() {
        let f = fixture();
        share(&f, link("https://example.com/a", None));

        f.hub.on_resp(&WechatResponse::SendMessage(SendMessageResp {
            err_code: err_code::USER_CANCEL,
            lang: None,
            country: None,
        }));
        f.wechat.complete_send(true);

        assert_eq!(f.capture.statuses(), vec![ResultStatus::Cancel]);
    }
}
