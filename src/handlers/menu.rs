//! Static menu handlers: commands, navigation, and the four menu sections.

use crate::bot::router::SelectionTag;
use crate::bot::state::{DialogState, StateKey};
use crate::bot::BotDeps;
use crate::channels::{InlineButton, OutgoingMessage};
use crate::error::ChannelError;
use crate::handlers::texts;

/// The four-entry main menu attached to welcome and navigation replies.
pub fn main_menu() -> Vec<InlineButton> {
    vec![
        InlineButton::callback(texts::MENU_LESSONS, SelectionTag::Lessons.as_str()),
        InlineButton::callback(texts::MENU_ROOTS, SelectionTag::RootsHelp.as_str()),
        InlineButton::callback(texts::MENU_GOODS, SelectionTag::JewishGoods.as_str()),
        InlineButton::callback(texts::MENU_QUESTION, SelectionTag::CommandmentsHelp.as_str()),
    ]
}

/// `/start`: reset the dialog and greet.
pub async fn start(deps: &BotDeps, key: StateKey) -> Result<(), ChannelError> {
    deps.states.clear(key).await;
    let message = OutgoingMessage::markdown(texts::WELCOME).with_buttons(main_menu());
    deps.channel.send(key.chat_id, message).await
}

/// `/help`: point at support. Leaves the dialog state alone.
pub async fn help(deps: &BotDeps, chat_id: i64) -> Result<(), ChannelError> {
    let message = OutgoingMessage::text(texts::help(&deps.content.support_handle));
    deps.channel.send(chat_id, message).await
}

/// Fallback for text nobody else wants: drop any stale state and show the menu.
pub async fn navigation(deps: &BotDeps, key: StateKey) -> Result<(), ChannelError> {
    deps.states.clear(key).await;
    let message = OutgoingMessage::markdown(texts::NAVIGATION).with_buttons(main_menu());
    deps.channel.send(key.chat_id, message).await
}

/// Handle a recognized menu button. `message_id` is the message carrying it.
///
/// The goods section arrives as a new message under the menu; every other
/// section replaces the pressed message.
pub async fn select(
    deps: &BotDeps,
    key: StateKey,
    tag: SelectionTag,
    message_id: Option<i64>,
) -> Result<(), ChannelError> {
    tracing::debug!(
        user_id = key.user_id,
        chat_id = key.chat_id,
        tag = tag.as_str(),
        "Menu selection"
    );

    let message = match tag {
        SelectionTag::Lessons => OutgoingMessage::markdown(texts::LESSONS).with_buttons(vec![
            InlineButton::url(texts::LESSONS_BUTTON, &deps.content.lessons_url),
        ]),
        SelectionTag::JewishGoods => {
            let goods = OutgoingMessage::markdown(texts::GOODS).with_buttons(vec![
                InlineButton::url(texts::GOODS_BUTTON, &deps.content.goods_url),
            ]);
            return deps.channel.send(key.chat_id, goods).await;
        }
        SelectionTag::RootsHelp => {
            deps.states.set(key, DialogState::AwaitingRoots).await;
            OutgoingMessage::markdown(texts::ROOTS_PROMPT)
        }
        SelectionTag::CommandmentsHelp => {
            deps.states.set(key, DialogState::AwaitingQuestion).await;
            OutgoingMessage::markdown(texts::QUESTION_PROMPT)
        }
    };

    replace_or_send(deps, key.chat_id, message_id, message).await
}

/// Edit the pressed message in place; if that fails, send a fresh one.
async fn replace_or_send(
    deps: &BotDeps,
    chat_id: i64,
    message_id: Option<i64>,
    message: OutgoingMessage,
) -> Result<(), ChannelError> {
    if let Some(message_id) = message_id {
        match deps.channel.edit(chat_id, message_id, message.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    chat_id,
                    message_id,
                    error = %e,
                    "Edit failed, sending a new message"
                );
            }
        }
    }
    deps.channel.send(chat_id, message).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{Sent, TestBot};

    const KEY: StateKey = StateKey {
        user_id: 7,
        chat_id: 70,
    };

    #[tokio::test]
    async fn start_clears_state_and_shows_menu() {
        let bot = TestBot::new().await;
        bot.deps.states.set(KEY, DialogState::AwaitingRoots).await;

        start(&bot.deps, KEY).await.unwrap();

        assert_eq!(bot.deps.states.get(KEY).await, None);
        let sent = bot.channel.sent();
        assert_eq!(sent.len(), 1);
        let Sent::New { chat_id, message } = &sent[0] else {
            panic!("expected a new message, got {:?}", sent[0]);
        };
        assert_eq!(*chat_id, 70);
        assert!(message.text.contains("Шалом"));
        assert_eq!(message.buttons, main_menu());
    }

    #[tokio::test]
    async fn help_keeps_state_and_names_support() {
        let bot = TestBot::new().await;
        bot.deps.states.set(KEY, DialogState::AwaitingQuestion).await;

        help(&bot.deps, KEY.chat_id).await.unwrap();

        assert_eq!(
            bot.deps.states.get(KEY).await,
            Some(DialogState::AwaitingQuestion)
        );
        assert!(bot.channel.last_text().contains("@support_username"));
    }

    #[tokio::test]
    async fn navigation_clears_stale_state() {
        let bot = TestBot::new().await;
        bot.deps.states.set(KEY, DialogState::AwaitingGoodsChoice).await;

        navigation(&bot.deps, KEY).await.unwrap();

        assert_eq!(bot.deps.states.get(KEY).await, None);
        assert!(bot.channel.last_text().contains("Навигация"));
    }

    #[tokio::test]
    async fn roots_help_sets_state_and_edits_message() {
        let bot = TestBot::new().await;

        select(&bot.deps, KEY, SelectionTag::RootsHelp, Some(5))
            .await
            .unwrap();

        assert_eq!(
            bot.deps.states.get(KEY).await,
            Some(DialogState::AwaitingRoots)
        );
        let sent = bot.channel.sent();
        assert!(matches!(&sent[0], Sent::Edit { message_id: 5, .. }));
        assert_eq!(sent[0].chat_id(), KEY.chat_id);
        assert!(bot.channel.last_text().contains("Имя НомерТелефона"));
    }

    #[tokio::test]
    async fn commandments_help_sets_question_state() {
        let bot = TestBot::new().await;

        select(&bot.deps, KEY, SelectionTag::CommandmentsHelp, Some(5))
            .await
            .unwrap();

        assert_eq!(
            bot.deps.states.get(KEY).await,
            Some(DialogState::AwaitingQuestion)
        );
    }

    #[tokio::test]
    async fn lessons_attaches_configured_url_without_touching_state() {
        let bot = TestBot::new().await;
        bot.deps.states.set(KEY, DialogState::AwaitingRoots).await;

        select(&bot.deps, KEY, SelectionTag::Lessons, Some(5))
            .await
            .unwrap();

        assert_eq!(
            bot.deps.states.get(KEY).await,
            Some(DialogState::AwaitingRoots)
        );
        let message = bot.channel.last_message();
        assert_eq!(
            message.buttons,
            vec![InlineButton::url(
                texts::LESSONS_BUTTON,
                &bot.deps.content.lessons_url
            )]
        );
    }

    #[tokio::test]
    async fn goods_arrives_as_new_message_with_shop_url() {
        let bot = TestBot::new().await;

        select(&bot.deps, KEY, SelectionTag::JewishGoods, Some(5))
            .await
            .unwrap();

        let sent = bot.channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::New { .. }));
        assert_eq!(sent[0].chat_id(), KEY.chat_id);
        let message = bot.channel.last_message();
        assert!(message.text.contains("Мезузы"));
        assert!(matches!(
            &message.buttons[0],
            InlineButton::Url { url, .. } if url == &bot.deps.content.goods_url
        ));
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_send() {
        let bot = TestBot::new().await;
        bot.channel.fail_edits();

        select(&bot.deps, KEY, SelectionTag::Lessons, Some(5))
            .await
            .unwrap();

        let sent = bot.channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::New { chat_id: 70, .. }));
    }

    #[tokio::test]
    async fn selection_without_message_sends_new() {
        let bot = TestBot::new().await;

        select(&bot.deps, KEY, SelectionTag::Lessons, None)
            .await
            .unwrap();

        assert!(matches!(&bot.channel.sent()[0], Sent::New { .. }));
    }

    #[test]
    fn main_menu_covers_every_tag() {
        let tags: Vec<String> = main_menu()
            .into_iter()
            .filter_map(|b| match b {
                InlineButton::Callback { tag, .. } => Some(tag),
                InlineButton::Url { .. } => None,
            })
            .collect();
        assert_eq!(
            tags,
            ["lessons", "roots_help", "jewish_goods", "commandments_help"]
        );
    }
}
