//! Sending command replies through an interaction.

use {
    serenity::{
        all::{
            CommandInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
            CreateInteractionResponseMessage, Http,
        },
        http::HttpError,
    },
    tracing::{debug, warn},
};

use crate::{Result, commands::Reply};

/// Send `replies` in order. The first uses the interaction response, the
/// rest go out as follow-ups. Failures are logged and do not stop the
/// remaining replies.
pub async fn send_replies(http: &Http, interaction: &CommandInteraction, replies: &[Reply]) {
    let mut responded = false;
    for reply in replies {
        if let Err(e) = send_reply(http, interaction, reply, responded).await {
            warn!(
                command = %interaction.data.name,
                channel_id = interaction.channel_id.get(),
                error = %e,
                "failed to deliver command reply"
            );
        }
        responded = true;
    }
}

async fn send_reply(
    http: &Http,
    interaction: &CommandInteraction,
    reply: &Reply,
    responded: bool,
) -> Result<()> {
    let result = if responded {
        let followup = CreateInteractionResponseFollowup::new()
            .content(&reply.content)
            .ephemeral(reply.ephemeral);
        interaction.create_followup(http, followup).await.map(|_| ())
    } else {
        let message = CreateInteractionResponseMessage::new()
            .content(&reply.content)
            .ephemeral(reply.ephemeral);
        interaction
            .create_response(http, CreateInteractionResponse::Message(message))
            .await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_unknown_interaction(&e) => {
            debug!(
                channel_id = interaction.channel_id.get(),
                "interaction expired, posting reply in channel"
            );
            interaction.channel_id.say(http, &reply.content).await?;
            Ok(())
        },
        Err(e) => Err(e.into()),
    }
}

/// Whether Discord no longer knows the interaction (token expired).
pub fn is_unknown_interaction(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}
