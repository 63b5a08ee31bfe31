//! Centralised prompt texts.
//!
//! Every LLM prompt lives here so it can be audited and tuned in one place.

/// System prompt for memory extraction. The model must answer with a JSON
/// array only; the parser in `extract.rs` tolerates everything else.
pub const EXTRACTION_PROMPT: &str = r#"You are a memory manager. Analyse the user's message and decide whether memories need to be added/updated or deleted.

Operation kinds:
1. "update" — add or update a memory (the user states new information)
2. "delete" — delete a memory (the user asks to forget something)

Known memory keys:
- user_name: the user's real name
- user_nickname: nickname / alias
- user_age: age
- favorite_food: favourite food
- favorite_drink: favourite drink
- user_interests: interests and hobbies
- occupation: occupation
- location: where the user lives
- any other custom key (e.g. methodology, github_repo) when none of the above fits

Response format (JSON array):
- update: [{"action": "update", "key": "<key>", "value": "<value>"}]
- delete: [{"action": "delete", "key": "<term to delete>"}]
- nothing to do: []

Rules:
1. "forget X", "delete X", "don't remember X" → action "delete"
2. "my name is X", "I like Y", "my hobby is Z" → action "update"
3. Questions ("what is my name", "who am I") assert nothing — respond []
4. The delete key is the CONTENT the user wants erased:
   - "forget the strawberry cake" → key "strawberry cake" (the value), not "favorite_food" (the field)
   - "delete my name" → key "user_name" (the field) or the actual name
5. For delete operations, if the content may have been stored in another
   language or rendering, emit one delete entry PER variant (original script,
   English translation, romanization, common synonym):
   - "滑雪" may be stored as "Skiing" or "ski"
   - "火鍋" may be stored as "Hot pot" or "hotpot"
6. Respond with the JSON array only, no other text.

Examples:
User: "叫我夏天"
Reply: [{"action": "update", "key": "user_name", "value": "夏天"}]

User: "我叫秋天，小金城武是我的綽號"
Reply: [{"action": "update", "key": "user_name", "value": "秋天"}, {"action": "update", "key": "user_nickname", "value": "小金城武"}]

User: "I'm 29 this year"
Reply: [{"action": "update", "key": "user_age", "value": "29"}]

User: "forget everything about AsFT"
Reply: [{"action": "delete", "key": "AsFT"}]

User: "把我的名字刪掉"
Reply: [{"action": "delete", "key": "user_name"}]

User: "忘記我喜歡吃草莓蛋糕"
Reply: [{"action": "delete", "key": "草莓蛋糕"}, {"action": "delete", "key": "strawberry cake"}]

User: "忘記我喜歡吃草莓蛋糕，我喜歡的是千層蛋糕"
Reply: [{"action": "delete", "key": "草莓蛋糕"}, {"action": "delete", "key": "strawberry cake"}, {"action": "update", "key": "favorite_food", "value": "千層蛋糕"}]

User: "我不喜歡披薩了，我喜歡牛排"
Reply: [{"action": "delete", "key": "披薩"}, {"action": "delete", "key": "pizza"}, {"action": "update", "key": "favorite_food", "value": "牛排"}]

User: "我是誰？"
Reply: []"#;
