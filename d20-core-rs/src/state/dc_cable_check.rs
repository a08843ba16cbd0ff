//! DC_CableCheck
//!
//! Answers `Ongoing` until the charger reports the insulation check result.

use tracing::info;

use super::{pull, respond_checked, session_stop, unexpected, DcPreCharge, EventKind, Transition};
use crate::context::Context;
use crate::control::CableCheckFinished;
use crate::feedback::Signal;
use crate::message::{DcCableCheckRequest, DcCableCheckResponse, Processing, Request, ResponseCode};
use crate::session::Session;

pub fn handle_request(
    req: &DcCableCheckRequest,
    session: &Session,
    cable_check_done: bool,
) -> DcCableCheckResponse {
    let mut res = DcCableCheckResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    res.processing = if cable_check_done {
        Processing::Finished
    } else {
        Processing::Ongoing
    };
    res.response_code = ResponseCode::Ok;
    res
}

/// Insulation check; the EV polls until the charger reports the result
#[derive(Debug, Default)]
pub struct DcCableCheck {
    cable_check_initiated: bool,
    cable_check_done: bool,
}

impl DcCableCheck {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            if let Some(CableCheckFinished(done)) = ctx.get_control_event::<CableCheckFinished>() {
                if done && !self.cable_check_done {
                    info!("Cable check finished");
                }
                self.cable_check_done = done;
            }
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "DC_CableCheck") else {
            return Transition::Stay;
        };

        match request {
            Request::DcCableCheck(req) => {
                let res = handle_request(&req, &ctx.session, self.cable_check_done);
                let finished = res.processing == Processing::Finished;

                if res.response_code == ResponseCode::Ok && !self.cable_check_initiated {
                    ctx.feedback.signal(Signal::StartCableCheck);
                    self.cable_check_initiated = true;
                }

                if !respond_checked(ctx, res) || !finished {
                    return Transition::Stay;
                }
                Transition::to(DcPreCharge::default())
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "DC_CableCheck", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use crate::control::{ControlEvent, PresentVoltageCurrent};
    use crate::feedback::FeedbackEvent;
    use crate::message::Response;
    use crate::state::{Event, State};

    fn cable_check(ctx: &Context) -> Event {
        Event::Message(Request::DcCableCheck(DcCableCheckRequest {
            header: header(ctx),
        }))
    }

    fn processing(ctx: &mut Context) -> Processing {
        match ctx.take_response() {
            Some(Response::DcCableCheck(res)) => {
                assert_eq!(res.response_code, ResponseCode::Ok);
                res.processing
            }
            other => panic!("expected DC_CableCheckRes, got {:?}", other),
        }
    }

    #[test]
    fn test_ongoing_until_cable_check_finished() {
        let (mut ctx, mut rx) = context_with_session();
        let mut state = State::DcCableCheck(DcCableCheck::default());

        for _ in 0..3 {
            assert!(state.feed(cable_check(&ctx), &mut ctx).is_stay());
            assert_eq!(processing(&mut ctx), Processing::Ongoing);
        }

        let signals: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, FeedbackEvent::Signal(_)))
            .collect();
        assert_eq!(signals, vec![FeedbackEvent::Signal(Signal::StartCableCheck)]);

        // stray control events change nothing
        let sample = ControlEvent::PresentVoltageCurrent(PresentVoltageCurrent {
            voltage: 400.0,
            current: 0.0,
        });
        assert!(state.feed(Event::Control(sample), &mut ctx).is_stay());
        assert!(ctx.take_response().is_none());

        let finished = ControlEvent::CableCheckFinished(CableCheckFinished(true));
        assert!(state.feed(Event::Control(finished), &mut ctx).is_stay());
        assert!(ctx.take_response().is_none());

        let transition = state.feed(cable_check(&ctx), &mut ctx);
        assert_eq!(processing(&mut ctx), Processing::Finished);
        assert!(matches!(transition, Transition::To(State::DcPreCharge(_))));
    }

    #[test]
    fn test_failed_cable_check_keeps_ongoing() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::DcCableCheck(DcCableCheck::default());

        let failed = ControlEvent::CableCheckFinished(CableCheckFinished(false));
        state.feed(Event::Control(failed), &mut ctx);

        assert!(state.feed(cable_check(&ctx), &mut ctx).is_stay());
        assert_eq!(processing(&mut ctx), Processing::Ongoing);
    }

    #[test]
    fn test_unknown_session_does_not_start_check() {
        let (mut ctx, mut rx) = context_with_session();
        let mut state = State::DcCableCheck(DcCableCheck::default());

        let req = Request::DcCableCheck(DcCableCheckRequest::default());
        assert!(state.feed(Event::Message(req), &mut ctx).is_stay());

        assert_eq!(
            ctx.take_response().unwrap().response_code(),
            ResponseCode::FailedUnknownSession
        );
        assert!(ctx.session_stopped);
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, FeedbackEvent::Signal(Signal::StartCableCheck))));
    }
}
