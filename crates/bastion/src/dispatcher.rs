//! # Outcome Dispatcher
//!
//! The only place a session's verdict leaves the session: the verified
//! store, the blacklist, the event channel, the log and the final packet
//! to the peer.
//!
//! ## Design
//!
//! - Success remembers the fingerprint, then transfers the client to the
//!   configured host (1.20.5+) or disconnects it with the success message
//! - Failure always disconnects with the same generic message; the
//!   detailed reason only reaches the log and the event
//! - Abort disconnects without penalizing the address
//! - [`refuse`] answers logins that never became a session

use bastion_protocol::packets::{Disconnect, Transfer};
use bastion_protocol::{Direction, Packet, PacketRegistry, Phase, ProtocolVersion};

use crate::channel::ClientChannel;
use crate::config::Messages;
use crate::error::{Rejection, VerificationError};
use crate::events::VerificationEvent;
use crate::session::StageContext;

/// Finishes a verified session.
pub(crate) fn succeed(ctx: &mut StageContext) {
    let verifier = std::sync::Arc::clone(&ctx.verifier);
    let config = verifier.config();
    let elapsed = ctx.elapsed();

    verifier.verified().put(ctx.fingerprint, ctx.now);
    verifier.events().send(VerificationEvent::Succeeded {
        address: ctx.address,
        username: ctx.username.clone(),
        fingerprint: ctx.fingerprint,
        version: ctx.version(),
        elapsed,
    });

    let verification = &config.verification;
    let result = if ctx.version().greater_or_equal(ProtocolVersion::V1_20_5) && !verification.transfer_host.is_empty()
    {
        ctx.send(Packet::Transfer(Transfer {
            host: verification.transfer_host.clone(),
            port: i32::from(verification.transfer_port),
        }))
    } else {
        ctx.send(Packet::Disconnect(Disconnect::new(config.messages.verification_success.as_str(), false)))
    };
    if let Err(error) = result {
        tracing::warn!("{}: could not send the verdict: {}", ctx.username, error);
    }
    ctx.close();

    tracing::info!(
        "{} ({}) has been verified successfully ({:.3}s)",
        ctx.username,
        verifier.format_address(ctx.address),
        elapsed.as_secs_f64()
    );
}

/// Finishes a failed session and penalizes its address.
pub(crate) fn fail(ctx: &mut StageContext, error: &VerificationError) {
    let verifier = std::sync::Arc::clone(&ctx.verifier);
    let config = verifier.config();

    let during_login = ctx.phase() == Phase::Login;
    if let Err(send_error) =
        ctx.send(Packet::Disconnect(Disconnect::new(config.messages.verification_failed.as_str(), during_login)))
    {
        tracing::debug!("{}: could not send the failure: {}", ctx.username, send_error);
    }
    ctx.close();

    let address = verifier.format_address(ctx.address);
    if verifier.should_log() {
        tracing::info!("{} ({}) has failed the bot check for: {}", ctx.username, address, error);
    }

    let score = verifier.blacklist().increment_at(ctx.address, ctx.now);
    verifier.events().send(VerificationEvent::Failed {
        address: ctx.address,
        username: ctx.username.clone(),
        reason: error.to_string(),
        score,
    });

    let threshold = config.verification.blacklist_threshold;
    if threshold > 0 && score >= threshold {
        verifier.events().send(VerificationEvent::Blacklisted { address: ctx.address, score });
        if verifier.should_log() {
            tracing::info!("{} ({}) has been blacklisted after {} failures", ctx.username, address, score);
        }
    }
}

/// Ends a session without a verdict.
pub(crate) fn abort(ctx: &mut StageContext, rejection: Rejection) {
    let verifier = std::sync::Arc::clone(&ctx.verifier);
    if let Some(message) = rejection.message(&verifier.config().messages) {
        let during_login = ctx.phase() == Phase::Login;
        if let Err(error) = ctx.send(Packet::Disconnect(Disconnect::new(message, during_login))) {
            tracing::debug!("{}: could not send the rejection: {}", ctx.username, error);
        }
    }
    ctx.close();
    tracing::debug!("{}: aborted: {}", ctx.username, rejection);
}

/// Refuses a login that never became a session.
///
/// The client is still in the login phase; an unknown version gets the
/// oldest encoding, which every client can parse.
pub fn refuse(channel: &mut dyn ClientChannel, version: ProtocolVersion, rejection: Rejection, messages: &Messages) {
    let version = if version.is_supported() { version } else { ProtocolVersion::OLDEST };
    if let Some(message) = rejection.message(messages) {
        let packet = Packet::Disconnect(Disconnect::new(message, true));
        match PacketRegistry::global().encode_frame(Phase::Login, Direction::Clientbound, version, &packet) {
            Ok(frame) => channel.write_frame(&frame),
            Err(error) => tracing::debug!("could not encode a refusal: {}", error),
        }
    }
    channel.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LoopbackChannel;
    use bastion_protocol::codec::FrameDecoder;

    #[test]
    fn test_refusal_is_one_login_disconnect() {
        let (mut channel, frames) = LoopbackChannel::pair();
        refuse(&mut channel, ProtocolVersion::V1_20_5, Rejection::Blacklisted, &Messages::default());

        let frames: Vec<Vec<u8>> = frames.try_iter().collect();
        assert_eq!(frames.len(), 1);
        let mut decoder = FrameDecoder::new();
        decoder.push(&frames[0]);
        let body = decoder.next_frame().unwrap().unwrap();
        // login disconnect id
        assert_eq!(body[0], 0x00);
        assert!(!channel.is_active());
    }

    #[test]
    fn test_silent_refusal() {
        let (mut channel, frames) = LoopbackChannel::pair();
        refuse(&mut channel, ProtocolVersion::V1_8, Rejection::DuplicateLogin, &Messages::default());
        assert_eq!(frames.try_iter().count(), 0);
        assert!(!channel.is_active());
    }

    #[test]
    fn test_unknown_version_falls_back_to_oldest() {
        let (mut channel, frames) = LoopbackChannel::pair();
        refuse(&mut channel, ProtocolVersion::Unknown, Rejection::UnsupportedVersion, &Messages::default());
        assert_eq!(frames.try_iter().count(), 1);
    }
}
