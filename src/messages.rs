/// User-facing text in the three languages the bot serves. Uzbek is the
/// default for unknown language codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Uz,
    Ru,
    En,
}

impl Lang {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(c) if c.starts_with("ru") => Lang::Ru,
            Some(c) if c.starts_with("en") => Lang::En,
            _ => Lang::Uz,
        }
    }
}

pub fn welcome(lang: Lang, schedule_time: &str) -> String {
    match lang {
        Lang::Uz => format!(
            "👋 Assalomu aleykum!\n\n\
            BPS (Euroasia Print) kompaniyasining rasmiy botiga xush kelibsiz!\n\n\
            📊 Buyruqlar:\n\
            /report - Bugungi hisobot\n\
            /period <boshlanish> <tugash> - Davr uchun hisobot\n\
            /help - Yordam\n\n\
            🕐 Kunlik hisobotlar har kuni soat {} da yuboriladi",
            schedule_time
        ),
        Lang::Ru => format!(
            "👋 Здравствуйте!\n\n\
            Добро пожаловать в официальный бот компании BPS (Euroasia Print)!\n\n\
            📊 Команды:\n\
            /report - Отчет за сегодня\n\
            /period <начало> <конец> - Отчет за период\n\
            /help - Справка\n\n\
            🕐 Ежедневные отчеты отправляются в {}",
            schedule_time
        ),
        Lang::En => format!(
            "👋 Hello!\n\n\
            Welcome to the official bot of BPS (Euroasia Print) company!\n\n\
            📊 Commands:\n\
            /report - Today's report\n\
            /period <from> <to> - Report for a period\n\
            /help - Help\n\n\
            🕐 Daily reports are sent at {}",
            schedule_time
        ),
    }
}

pub fn help(lang: Lang, schedule_time: &str) -> String {
    match lang {
        Lang::Uz => format!(
            "📊 Buyruqlar haqida:\n\n\
            /report - Bugungi kun uchun hisobot\n\
            /period <boshlanish> <tugash> - Tanlangan davr uchun hisobot\n\
            Sanalar YYYY-MM-DD formatida kiritiladi.\n\
            Masalan: /period 2024-01-15 2024-01-31\n\n\
            📱 Hisobot olish uchun avval telefon raqamingizni ro'yxatdan o'tkazing.\n\
            📅 Kunlik hisobotlar har kuni soat {} da avtomatik yuboriladi.",
            schedule_time
        ),
        Lang::Ru => format!(
            "📊 О командах:\n\n\
            /report - Отчет за сегодняшний день\n\
            /period <начало> <конец> - Отчет за выбранный период\n\
            Даты вводятся в формате YYYY-MM-DD.\n\
            Например: /period 2024-01-15 2024-01-31\n\n\
            📱 Для получения отчетов сначала зарегистрируйте номер телефона.\n\
            📅 Ежедневные отчеты отправляются автоматически в {}.",
            schedule_time
        ),
        Lang::En => format!(
            "📊 About the commands:\n\n\
            /report - Report for today\n\
            /period <from> <to> - Report for a chosen period\n\
            Dates use the YYYY-MM-DD format.\n\
            Example: /period 2024-01-15 2024-01-31\n\n\
            📱 Register your phone number first to receive reports.\n\
            📅 Daily reports are sent automatically at {}.",
            schedule_time
        ),
    }
}

pub fn share_contact_prompt(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📱 Telefon raqamingizni ro'yxatdan o'tkazish uchun quyidagi tugmani bosing.\n\nBu sizga kunlik hisobotlar olish imkonini beradi.",
        Lang::Ru => "📱 Нажмите кнопку ниже, чтобы зарегистрировать номер телефона.\n\nЭто позволит вам получать ежедневные отчеты.",
        Lang::En => "📱 Press the button below to register your phone number.\n\nThis will allow you to receive daily reports.",
    }
}

pub fn share_contact_button(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📱 Telefon raqamini ulashish",
        Lang::Ru => "📱 Поделиться номером телефона",
        Lang::En => "📱 Share Phone Number",
    }
}

pub fn checking_phone(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "⏳ Telefon raqamingiz tekshirilmoqda...",
        Lang::Ru => "⏳ Проверяем ваш номер телефона...",
        Lang::En => "⏳ Checking your phone number...",
    }
}

pub fn registration_success(lang: Lang, phone: &str, schedule_time: &str) -> String {
    match lang {
        Lang::Uz => format!(
            "✅ Telefon raqamingiz muvaffaqiyatli ro'yxatdan o'tkazildi!\n📱 {}\n\n\
            📊 Endi siz har kuni soat {} da avtomatik hisobotlar olasiz.\n\n\
            💡 Istalgan vaqtda /report buyrug'i orqali bugungi hisobotni olishingiz mumkin.",
            phone, schedule_time
        ),
        Lang::Ru => format!(
            "✅ Ваш номер телефона успешно зарегистрирован!\n📱 {}\n\n\
            📊 Теперь вы будете получать автоматические отчеты каждый день в {}.\n\n\
            💡 Вы также можете получить отчет за сегодня в любое время командой /report.",
            phone, schedule_time
        ),
        Lang::En => format!(
            "✅ Your phone number has been successfully registered!\n📱 {}\n\n\
            📊 You will now receive automatic reports every day at {}.\n\n\
            💡 You can also get today's report anytime with the /report command.",
            phone, schedule_time
        ),
    }
}

pub fn own_contact_only(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Faqat o'z telefon raqamingizni ro'yxatdan o'tkazishingiz mumkin.",
        Lang::Ru => "❌ Вы можете зарегистрировать только свой номер телефона.",
        Lang::En => "❌ You can only register your own phone number.",
    }
}

pub fn not_registered(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Sizning telefon raqamingiz bizning ma'lumotlar bazasida topilmadi.\n\nIltimos, admin bilan bog'laning.",
        Lang::Ru => "❌ Ваш номер телефона не найден в нашей базе данных.\n\nПожалуйста, свяжитесь с администратором.",
        Lang::En => "❌ Your phone number was not found in our database.\n\nPlease contact the administrator.",
    }
}

pub fn invalid_phone(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Telefon raqam formati noto'g'ri. Iltimos, qaytadan urinib ko'ring.",
        Lang::Ru => "❌ Неверный формат номера телефона. Пожалуйста, попробуйте снова.",
        Lang::En => "❌ Invalid phone number format. Please try again.",
    }
}

pub fn generating(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📊 Hisobot yaratilmoqda... Iltimos kutib turing.",
        Lang::Ru => "📊 Генерируется отчет... Пожалуйста, подождите.",
        Lang::En => "📊 Generating report... Please wait.",
    }
}

pub fn already_processing(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "⚠️ Bu raqam uchun hisobot allaqachon tayyorlanmoqda. Iltimos kutib turing.",
        Lang::Ru => "⚠️ Отчет для этого номера уже готовится. Пожалуйста, подождите.",
        Lang::En => "⚠️ Report for this number is already being processed. Please wait.",
    }
}

pub fn no_data(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Sizning telefon raqamingiz uchun ma'lumot topilmadi.",
        Lang::Ru => "❌ Данные для вашего номера телефона не найдены.",
        Lang::En => "❌ No data found for your phone number.",
    }
}

pub fn report_caption(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "✅ Hisobotingiz tayyor!",
        Lang::Ru => "✅ Ваш отчет готов!",
        Lang::En => "✅ Your report is ready!",
    }
}

pub fn report_sent(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "✅ Hisobot muvaffaqiyatli yuborildi.",
        Lang::Ru => "✅ Отчет успешно отправлен.",
        Lang::En => "✅ Report sent successfully.",
    }
}

pub fn error_generating(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Hisobot yaratishda xatolik yuz berdi. Iltimos qaytadan urinib ko'ring.",
        Lang::Ru => "❌ Ошибка при создании отчета. Пожалуйста, попробуйте снова.",
        Lang::En => "❌ Error generating report. Please try again.",
    }
}

pub fn general_error(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Xatolik yuz berdi. Iltimos qaytadan urinib ko'ring.",
        Lang::Ru => "❌ Произошла ошибка. Пожалуйста, попробуйте снова.",
        Lang::En => "❌ An error occurred. Please try again.",
    }
}

pub fn period_usage(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📅 Foydalanish: /period <boshlanish> <tugash>\n\nSanalar YYYY-MM-DD formatida.\nMasalan: /period 2024-01-15 2024-01-31",
        Lang::Ru => "📅 Использование: /period <начало> <конец>\n\nДаты в формате YYYY-MM-DD.\nНапример: /period 2024-01-15 2024-01-31",
        Lang::En => "📅 Usage: /period <from> <to>\n\nDates use the YYYY-MM-DD format.\nExample: /period 2024-01-15 2024-01-31",
    }
}

pub fn invalid_date(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Noto'g'ri sana formati. Iltimos YYYY-MM-DD formatida kiriting.\n\nMasalan: 2024-01-15",
        Lang::Ru => "❌ Неверный формат даты. Пожалуйста, введите в формате YYYY-MM-DD.\n\nНапример: 2024-01-15",
        Lang::En => "❌ Invalid date format. Please enter in YYYY-MM-DD format.\n\nExample: 2024-01-15",
    }
}

pub fn invalid_range(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "❌ Tugash sanasi boshlanish sanasidan kichik bo'lishi mumkin emas.",
        Lang::Ru => "❌ Дата окончания не может быть раньше даты начала.",
        Lang::En => "❌ End date cannot be earlier than start date.",
    }
}

pub fn daily_no_data(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📭 Bugun uchun ma'lumotlar topilmadi.",
        Lang::Ru => "📭 Данные на сегодня не найдены.",
        Lang::En => "📭 No data found for today.",
    }
}

pub fn daily_caption(lang: Lang) -> &'static str {
    match lang {
        Lang::Uz => "📊 Bugungi kunlik hisobot",
        Lang::Ru => "📊 Ежедневный отчет на сегодня",
        Lang::En => "📊 Today's daily report",
    }
}

/// Labels used inside generated report artifacts (CSV header block and the
/// plain-text rendering).
pub struct ReportLabels {
    pub title: &'static str,
    pub phone_number: &'static str,
    pub from_date: &'static str,
    pub to_date: &'static str,
    pub generated_at: &'static str,
    pub report_data: &'static str,
    pub no_data_available: &'static str,
}

pub fn report_labels(lang: Lang) -> ReportLabels {
    match lang {
        Lang::Uz => ReportLabels {
            title: "Hisobot",
            phone_number: "Telefon raqami",
            from_date: "Boshlanish sanasi",
            to_date: "Tugash sanasi",
            generated_at: "Yaratilgan sana",
            report_data: "Hisobot ma'lumotlari",
            no_data_available: "Ma'lumot topilmadi",
        },
        Lang::Ru => ReportLabels {
            title: "Отчет",
            phone_number: "Номер телефона",
            from_date: "Дата начала",
            to_date: "Дата окончания",
            generated_at: "Дата создания",
            report_data: "Данные отчета",
            no_data_available: "Данные не найдены",
        },
        Lang::En => ReportLabels {
            title: "Report",
            phone_number: "Phone Number",
            from_date: "From Date",
            to_date: "To Date",
            generated_at: "Generated At",
            report_data: "Report Data",
            no_data_available: "No data available",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_codes_fall_back_to_uzbek() {
        assert_eq!(Lang::from_code(Some("uz")), Lang::Uz);
        assert_eq!(Lang::from_code(Some("ru")), Lang::Ru);
        assert_eq!(Lang::from_code(Some("ru-RU")), Lang::Ru);
        assert_eq!(Lang::from_code(Some("en")), Lang::En);
        assert_eq!(Lang::from_code(Some("de")), Lang::Uz);
        assert_eq!(Lang::from_code(None), Lang::Uz);
    }

    #[test]
    fn registration_success_includes_phone_and_schedule() {
        let text = registration_success(Lang::Ru, "998901234567", "23:50");
        assert!(text.contains("998901234567"));
        assert!(text.contains("23:50"));
    }

    #[test]
    fn welcome_mentions_the_configured_schedule() {
        for lang in [Lang::Uz, Lang::Ru, Lang::En] {
            assert!(welcome(lang, "23:50").contains("23:50"));
        }
    }
}
