//! User-facing reply texts (Russian, Telegram Markdown).

pub const WELCOME: &str = "✡️ *Шалом!* ✡️

Я ваш виртуальный помощник по еврейским традициям.
Чем могу помочь сегодня?

Выберите одну из опций ниже:";

pub const NAVIGATION: &str = "🔍 *Навигация*

Используйте кнопки ниже для выбора нужного раздела:";

pub const LESSONS: &str = "📚 *Уроки Торы*

Нажмите кнопку ниже для перехода к урокам:";

pub const GOODS: &str = "🛍️ *Еврейские товары*

Каждый еврей должен иметь:
- Кипы
- Талиты
- Мезузы
- Ханукии
- И другие религиозные атрибуты

Нажмите кнопку ниже, чтобы перейти в наш магазин:";

pub const ROOTS_PROMPT: &str = "🌳 *Поиск еврейских корней*

Пожалуйста, отправьте ваши данные в формате:
*Имя НомерТелефона*

Пример:
Моше 89161234567 или Давид +79161234567

Мы свяжемся с вами для уточнения деталей.";

pub const QUESTION_PROMPT: &str = "✡️ *Консультация по еврейским вопросам*

Опишите ваш вопрос подробно, и наш мудрец даст вам развернутый ответ согласно традициям.

Примеры вопросов:
- Как правильно соблюдать шаббат?
- Какие есть законы кашрута?
- Как проводить еврейскую свадьбу?";

pub const ROOTS_FORMAT_ERROR: &str = "❌ *Неверный формат*

Пожалуйста, укажите *имя и номер телефона* через пробел.

Пример:
Авраам 89161234567 или Сара +79161234567";

pub const ROOTS_INVALID_NAME: &str = "❌ *Неверное имя*

Имя должно содержать буквы. Пожалуйста, отправьте данные еще раз:
*Имя НомерТелефона*";

pub const ROOTS_INVALID_PHONE: &str = "❌ *Неверный номер телефона*

Пожалуйста, используйте один из форматов:
- `89161234567`
- `+79161234567`

Попробуйте еще раз:";

pub const ROOTS_ALREADY_SUBMITTED: &str =
    "ℹ️ Вы уже оставляли заявку. Мы скоро с вами свяжемся!";

pub const ROOTS_SAVE_ERROR: &str = "⚠️ *Ошибка сохранения!* Пожалуйста, попробуйте позже.";

pub const QUESTION_LENGTH_ERROR: &str = "❌ *Вопрос не принят*

Вопрос должен быть непустым и не длиннее 1000 символов.";

pub const PROVIDER_APOLOGY: &str =
    "⚠️ Извините, не могу обработать запрос сейчас. Пожалуйста, попробуйте позже.";

pub const LESSONS_BUTTON: &str = "➡️ Перейти к урокам";
pub const GOODS_BUTTON: &str = "🛒 Перейти в магазин";

pub const MENU_LESSONS: &str = "📖 Уроки Торы";
pub const MENU_ROOTS: &str = "🌳 Поиск корней";
pub const MENU_GOODS: &str = "🛍️ Еврейские товары";
pub const MENU_QUESTION: &str = "❓ Консультация по еврейским вопросам";

/// Help text pointing at the support account.
pub fn help(support_handle: &str) -> String {
    format!(
        "🆘 Помощь

Если у вас возникли вопросы или проблемы, пожалуйста:
1. Опишите вашу проблему
2. Напишите нам {support_handle}
3. Мы ответим в ближайшее время!

Спасибо за обращение! 🙏"
    )
}

/// Confirmation echoing what was stored.
pub fn roots_saved(name: &str, phone: &str) -> String {
    format!(
        "✅ *Спасибо за заявку!*

Ваши данные:
- *Имя:* {name}
- *Телефон:* {phone}

Мы свяжемся с вами в ближайшее время! 📞"
    )
}

/// Frame around a completion answer.
pub fn answer(body: &str) -> String {
    format!(
        "✡️ *Ответ на ваш вопрос* ✡️

{body}

Если у вас остались вопросы, не стесняйтесь задавать их! 🙏"
    )
}
